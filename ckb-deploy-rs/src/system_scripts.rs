use ckb_types::{
    core::DepType,
    h256,
    packed::{CellDep, OutPoint},
    prelude::*,
    H256,
};
use log::debug;

use crate::error::{Error, Result};
use crate::rpc::ChainClient;

pub const SIGHASH_TYPE_HASH: H256 =
    h256!("0x9bd7e06f3ecf4be0f2fcd2188b23f1b9fcc88e5d4b65a8637b17723bbda3cce8");

/// Genesis transaction that carries the secp256k1 dep group.
const DEP_GROUP_TX_INDEX: usize = 1;

/// Secp256k1 blake160 sighash lock as deployed in the genesis block.
#[derive(Debug, Clone)]
pub struct SystemScripts {
    pub sighash_code_hash: H256,
    pub sighash_dep: CellDep,
}

impl SystemScripts {
    pub fn load<C: ChainClient + ?Sized>(client: &C) -> Result<Self> {
        let hashes = client
            .genesis_tx_hashes()
            .map_err(|err| Error::SystemScripts(err.to_string()))?;
        let dep_group_tx = hashes.get(DEP_GROUP_TX_INDEX).ok_or_else(|| {
            Error::SystemScripts(format!(
                "genesis block has {} transactions, dep group missing",
                hashes.len()
            ))
        })?;
        debug!("secp256k1 dep group at {:#x}:0", dep_group_tx);
        Ok(Self::from_dep_group(dep_group_tx.clone()))
    }

    pub fn from_dep_group(tx_hash: H256) -> Self {
        let sighash_dep = CellDep::new_builder()
            .out_point(OutPoint::new(tx_hash.pack(), 0))
            .dep_type(DepType::DepGroup.into())
            .build();
        Self {
            sighash_code_hash: SIGHASH_TYPE_HASH,
            sighash_dep,
        }
    }
}
