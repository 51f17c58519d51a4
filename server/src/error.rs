use snafu::Snafu;

/// Everything that can keep the relay from coming up. Once it is serving,
/// nothing here applies: per-message failures are logged and dropped.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid bind address {:?}: {}", addr, source))]
    ResolveBindAddr {
        addr: String,
        source: std::io::Error,
    },

    #[snafu(display("no addresses resolved for {:?}", addr))]
    NoBindAddr { addr: String },

    #[snafu(display("could not bind {}: {}", addr, source))]
    Bind {
        addr: std::net::SocketAddr,
        source: warp::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
