pub mod codec;
pub mod config;
pub mod draft;
pub mod error;
pub mod generate_sighash_all;
pub mod key;
pub mod pixel;
pub mod plan;
pub mod rpc;
pub mod script_group;
pub mod signer;
pub mod system_scripts;
pub mod workflow;

pub use config::DeployConfig;
pub use error::{Error, GroupError, InputError, PixelError, Result};
pub use key::SigningKey;
pub use plan::DeployPlan;
pub use rpc::{ChainClient, LiveCell, RpcClient, RpcError};
pub use workflow::{build_transaction, deploy, submit, Deployment};
