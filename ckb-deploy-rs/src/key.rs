use std::fmt;

use ckb_crypto::secp::{Privkey, Pubkey, Signature};
use ckb_types::{bytes::Bytes, core::ScriptHashType, packed::Script, prelude::*, H256};

use crate::codec::decode_fixed;
use crate::error::{Error, Result};
use crate::system_scripts::SystemScripts;

pub const SIGNATURE_SIZE: usize = 65;

pub fn blake160(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&ckb_hash::blake2b_256(data)[..20]);
    out
}

/// A secp256k1 secret key owning the caller's sighash lock.
pub struct SigningKey {
    privkey: Privkey,
    pubkey: Pubkey,
}

impl SigningKey {
    pub fn from_hex(s: &str) -> Result<Self> {
        let raw = decode_fixed::<32>("private_key", s)
            .map_err(|err| Error::CredentialImport(err.to_string()))?;
        Self::from_bytes(raw)
    }

    pub fn from_bytes(raw: [u8; 32]) -> Result<Self> {
        Self::from_privkey(Privkey::from(H256(raw)))
    }

    pub fn from_privkey(privkey: Privkey) -> Result<Self> {
        let pubkey = privkey
            .pubkey()
            .map_err(|err| Error::CredentialImport(err.to_string()))?;
        Ok(Self { privkey, pubkey })
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.pubkey
    }

    pub fn lock_args(&self) -> Bytes {
        Bytes::copy_from_slice(&blake160(&self.pubkey.serialize()))
    }

    pub fn lock_script(&self, scripts: &SystemScripts) -> Script {
        Script::new_builder()
            .code_hash(scripts.sighash_code_hash.pack())
            .hash_type(ScriptHashType::Type.into())
            .args(self.lock_args().pack())
            .build()
    }

    pub fn sign(&self, message: &[u8; 32]) -> Result<Signature> {
        self.privkey
            .sign_recoverable(&H256(*message))
            .map_err(|err| Error::Signing(err.to_string()))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("lock_args", &hex::encode(self.lock_args()))
            .finish()
    }
}
