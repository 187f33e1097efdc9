use ckb_types::{
    bytes::Bytes,
    core::ScriptHashType,
    packed::{CellDep, OutPoint, Script},
    prelude::*,
    H256,
};

use crate::key::SigningKey;
use crate::pixel::PixelRules;

/// Fully decoded deployment: nothing in here needs parsing anymore.
#[derive(Debug)]
pub struct DeployPlan {
    pub rpc_url: String,
    pub key: SigningKey,
    pub cell_deps: Vec<CellDep>,
    pub outputs: Vec<OutputSpec>,
    pub input_groups: Vec<InputGroup>,
    pub change: Option<ChangeSpec>,
    /// Offline pixel checks, run before signing when present.
    pub pixel: Option<PixelRules>,
    pub print_tx: bool,
}

#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub capacity: u64,
    pub lock: ScriptSpec,
    pub type_: Option<ScriptSpec>,
    pub data: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptSpec {
    /// The caller's own sighash lock.
    Owner,
    Custom {
        code_hash: H256,
        hash_type: ScriptHashType,
        args: ArgsSpec,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgsSpec {
    Literal(Bytes),
    /// blake160 of the caller's pubkey.
    OwnerArgs,
    /// Script hash of the caller's lock.
    OwnerLockHash,
}

#[derive(Debug, Clone)]
pub struct InputGroup {
    pub out_points: Vec<OutPoint>,
    pub sign: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSpec {
    pub fee: u64,
}

impl ScriptSpec {
    pub fn resolve(&self, owner: &Script) -> Script {
        match self {
            ScriptSpec::Owner => owner.clone(),
            ScriptSpec::Custom {
                code_hash,
                hash_type,
                args,
            } => Script::new_builder()
                .code_hash(code_hash.pack())
                .hash_type((*hash_type).into())
                .args(args.resolve(owner).pack())
                .build(),
        }
    }
}

impl ArgsSpec {
    pub fn resolve(&self, owner: &Script) -> Bytes {
        match self {
            ArgsSpec::Literal(bytes) => bytes.clone(),
            ArgsSpec::OwnerArgs => owner.args().raw_data(),
            ArgsSpec::OwnerLockHash => owner.calc_script_hash().raw_data(),
        }
    }
}

impl DeployPlan {
    pub fn output_capacity(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, output| acc.checked_add(output.capacity))
    }

    pub fn input_count(&self) -> usize {
        self.input_groups.iter().map(|g| g.out_points.len()).sum()
    }
}
