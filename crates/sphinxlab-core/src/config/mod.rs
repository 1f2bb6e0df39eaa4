pub mod consts;
pub mod model;

pub use model::{
    BuildConfig, Config, ExecConfig, NetworkConfig, ProxyConfig, ProxyScheme, SphinxConfig,
    TlsVersion,
};
