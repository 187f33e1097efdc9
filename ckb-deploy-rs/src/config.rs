//! On-disk deployment description.
//!
//! A config is plain TOML with every binary value written as hex. Turning it
//! into a [`DeployPlan`] decodes all of them, so a typo in a hash is reported
//! before the node is ever contacted.

use std::fmt;
use std::path::Path;

use ckb_types::{
    core::DepType,
    packed::{CellDep, OutPoint},
    prelude::*,
};
use serde::Deserialize;

use crate::codec::{decode_bytes, decode_h256, parse_hash_type};
use crate::error::{Error, Result};
use crate::key::SigningKey;
use crate::pixel::{PixelRules, OFFICIAL_LOCK_HASH};
use crate::plan::{ArgsSpec, ChangeSpec, DeployPlan, InputGroup, OutputSpec, ScriptSpec};

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8114";

const OWNER_ARGS: &str = "@owner_args";
const OWNER_LOCK_HASH: &str = "@owner_lock_hash";

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    pub private_key: String,
    #[serde(default)]
    pub print_tx: bool,
    #[serde(default)]
    pub cell_deps: Vec<CellDepConfig>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    #[serde(default)]
    pub input_groups: Vec<InputGroupConfig>,
    #[serde(default)]
    pub change: Option<ChangeConfig>,
    #[serde(default)]
    pub pixel: Option<PixelConfig>,
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("print_tx", &self.print_tx)
            .field("cell_deps", &self.cell_deps)
            .field("outputs", &self.outputs)
            .field("input_groups", &self.input_groups)
            .field("change", &self.change)
            .field("pixel", &self.pixel)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutPointConfig {
    pub tx_hash: String,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepTypeConfig {
    #[default]
    Code,
    DepGroup,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellDepConfig {
    pub tx_hash: String,
    pub index: u32,
    #[serde(default)]
    pub dep_type: DepTypeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScriptConfig {
    /// The literal string `"owner"`.
    Keyword(String),
    Table(ScriptTableConfig),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptTableConfig {
    pub code_hash: String,
    pub hash_type: String,
    pub args: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub capacity: u64,
    pub lock: ScriptConfig,
    #[serde(default, rename = "type")]
    pub type_: Option<ScriptConfig>,
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputGroupConfig {
    #[serde(default = "default_sign")]
    pub sign: bool,
    pub out_points: Vec<OutPointConfig>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeConfig {
    #[serde(default)]
    pub fee: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PixelConfig {
    pub canvas_code_hash: String,
    #[serde(default)]
    pub official_lock_hash: Option<String>,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_owned()
}

fn default_sign() -> bool {
    true
}

impl DeployConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("{}: {}", path.display(), err)))?;
        Self::from_toml_str(&content)
            .map_err(|err| Error::Config(format!("{}: {}", path.display(), err)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|err| Error::Config(err.to_string()))
    }

    /// Decodes every literal. Fails on the first malformed value.
    pub fn into_plan(self) -> Result<DeployPlan> {
        let key = SigningKey::from_hex(&self.private_key)?;

        let cell_deps = self
            .cell_deps
            .iter()
            .enumerate()
            .map(|(i, dep)| dep.parse(&format!("cell_deps[{}]", i)))
            .collect::<Result<Vec<_>>>()?;

        let outputs = self
            .outputs
            .iter()
            .enumerate()
            .map(|(i, output)| output.parse(&format!("outputs[{}]", i)))
            .collect::<Result<Vec<_>>>()?;

        let input_groups = self
            .input_groups
            .iter()
            .enumerate()
            .map(|(i, group)| group.parse(&format!("input_groups[{}]", i)))
            .collect::<Result<Vec<_>>>()?;

        let pixel = match &self.pixel {
            Some(pixel) => Some(pixel.parse("pixel")?),
            None => None,
        };

        Ok(DeployPlan {
            rpc_url: self.rpc_url,
            key,
            cell_deps,
            outputs,
            input_groups,
            change: self.change.map(|change| ChangeSpec { fee: change.fee }),
            pixel,
            print_tx: self.print_tx,
        })
    }
}

impl OutPointConfig {
    fn parse(&self, field: &str) -> Result<OutPoint> {
        let tx_hash = decode_h256(&format!("{}.tx_hash", field), &self.tx_hash)?;
        Ok(OutPoint::new(tx_hash.pack(), self.index))
    }
}

impl CellDepConfig {
    fn parse(&self, field: &str) -> Result<CellDep> {
        let tx_hash = decode_h256(&format!("{}.tx_hash", field), &self.tx_hash)?;
        let dep_type = match self.dep_type {
            DepTypeConfig::Code => DepType::Code,
            DepTypeConfig::DepGroup => DepType::DepGroup,
        };
        Ok(CellDep::new_builder()
            .out_point(OutPoint::new(tx_hash.pack(), self.index))
            .dep_type(dep_type.into())
            .build())
    }
}

impl ScriptConfig {
    fn parse(&self, field: &str) -> Result<ScriptSpec> {
        match self {
            ScriptConfig::Keyword(word) if word == "owner" => Ok(ScriptSpec::Owner),
            ScriptConfig::Keyword(word) => Err(Error::decode(
                field,
                format!("expect \"owner\" or a script table, got {:?}", word),
            )),
            ScriptConfig::Table(table) => table.parse(field),
        }
    }
}

impl ScriptTableConfig {
    fn parse(&self, field: &str) -> Result<ScriptSpec> {
        let args = match self.args.as_str() {
            OWNER_ARGS => ArgsSpec::OwnerArgs,
            OWNER_LOCK_HASH => ArgsSpec::OwnerLockHash,
            literal => ArgsSpec::Literal(decode_bytes(&format!("{}.args", field), literal)?),
        };
        Ok(ScriptSpec::Custom {
            code_hash: decode_h256(&format!("{}.code_hash", field), &self.code_hash)?,
            hash_type: parse_hash_type(&format!("{}.hash_type", field), &self.hash_type)?,
            args,
        })
    }
}

impl PixelConfig {
    fn parse(&self, field: &str) -> Result<PixelRules> {
        let official_lock_hash = match &self.official_lock_hash {
            Some(hash) => decode_h256(&format!("{}.official_lock_hash", field), hash)?,
            None => OFFICIAL_LOCK_HASH,
        };
        Ok(PixelRules {
            canvas_code_hash: decode_h256(
                &format!("{}.canvas_code_hash", field),
                &self.canvas_code_hash,
            )?,
            official_lock_hash,
        })
    }
}

impl OutputConfig {
    fn parse(&self, field: &str) -> Result<OutputSpec> {
        let type_ = match &self.type_ {
            Some(script) => Some(script.parse(&format!("{}.type", field))?),
            None => None,
        };
        Ok(OutputSpec {
            capacity: self.capacity,
            lock: self.lock.parse(&format!("{}.lock", field))?,
            type_,
            data: decode_bytes(&format!("{}.data", field), &self.data)?,
        })
    }
}

impl InputGroupConfig {
    fn parse(&self, field: &str) -> Result<InputGroup> {
        let out_points = self
            .out_points
            .iter()
            .enumerate()
            .map(|(i, out_point)| out_point.parse(&format!("{}.out_points[{}]", field, i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(InputGroup {
            out_points,
            sign: self.sign,
        })
    }
}
