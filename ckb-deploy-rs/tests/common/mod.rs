#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use ckb_crypto::secp::Signature;
use ckb_deploy_rs::{ChainClient, LiveCell, RpcError};
use ckb_hash::{blake2b_256, new_blake2b};
use ckb_types::{
    bytes::Bytes,
    core::{ScriptHashType, TransactionView},
    packed::{CellOutput, OutPoint, Script, WitnessArgs},
    prelude::*,
    H256,
};

pub const DEP_GROUP_TX: H256 = H256([0x71; 32]);

/// In-memory chain: live cells by outpoint, a fixed genesis, and a log of
/// everything submitted.
#[derive(Default)]
pub struct DummyChain {
    pub cells: HashMap<OutPoint, LiveCell>,
    pub calls: Cell<usize>,
    pub sent: RefCell<Vec<TransactionView>>,
    pub reject_with: Option<String>,
    pub offline: bool,
}

impl DummyChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cell(&mut self, out_point: OutPoint, capacity: u64, lock: Script) {
        self.add_typed_cell(out_point, capacity, lock, None, Bytes::new());
    }

    pub fn add_typed_cell(
        &mut self,
        out_point: OutPoint,
        capacity: u64,
        lock: Script,
        type_: Option<Script>,
        data: Bytes,
    ) {
        let output = CellOutput::new_builder()
            .capacity(capacity.pack())
            .lock(lock)
            .type_(type_.pack())
            .build();
        self.cells.insert(out_point, LiveCell { output, data });
    }

    fn touch(&self) -> Result<(), RpcError> {
        self.calls.set(self.calls.get() + 1);
        if self.offline {
            return Err(RpcError::Remote {
                code: -32603,
                message: "connection refused".to_owned(),
            });
        }
        Ok(())
    }
}

impl ChainClient for DummyChain {
    fn tip_block_number(&self) -> Result<u64, RpcError> {
        self.touch()?;
        Ok(1024)
    }

    fn genesis_tx_hashes(&self) -> Result<Vec<H256>, RpcError> {
        self.touch()?;
        Ok(vec![H256([0x70; 32]), DEP_GROUP_TX])
    }

    fn live_cell(&self, out_point: &OutPoint) -> Result<Option<LiveCell>, RpcError> {
        self.touch()?;
        Ok(self.cells.get(out_point).cloned())
    }

    fn send_transaction(&self, tx: &TransactionView) -> Result<H256, RpcError> {
        self.touch()?;
        if let Some(message) = &self.reject_with {
            return Err(RpcError::Remote {
                code: -302,
                message: message.clone(),
            });
        }
        self.sent.borrow_mut().push(tx.clone());
        Ok(tx.hash().unpack())
    }
}

pub fn out_point(n: u8, index: u32) -> OutPoint {
    OutPoint::new(H256([n; 32]).pack(), index)
}

pub fn other_lock() -> Script {
    Script::new_builder()
        .code_hash(H256([0xe9; 32]).pack())
        .hash_type(ScriptHashType::Type.into())
        .args(Bytes::from(vec![0xed; 20]).pack())
        .build()
}

/// Checks `tx` the way the node runs a blake160 sighash lock: inputs grouped
/// by lock hash over the whole transaction, one signature in the first
/// witness of a group, digest over every witness of that group plus those
/// past the last input, recovered key hashed to the lock args.
///
/// Groups whose first witness is empty are left alone. Returns the hashes of
/// the locks that carried a valid signature, in input order.
pub fn verify_signatures(chain: &DummyChain, tx: &TransactionView) -> Vec<H256> {
    let mut groups: Vec<(H256, Script, Vec<usize>)> = Vec::new();
    for (index, input) in tx.inputs().into_iter().enumerate() {
        let cell = chain
            .cells
            .get(&input.previous_output())
            .expect("input is a known cell");
        let lock = cell.output.lock();
        let lock_hash: H256 = lock.calc_script_hash().unpack();
        match groups.iter_mut().find(|(hash, _, _)| *hash == lock_hash) {
            Some((_, _, indices)) => indices.push(index),
            None => groups.push((lock_hash, lock, vec![index])),
        }
    }

    let inputs_len = tx.inputs().len();
    let witnesses: Vec<Bytes> = tx.witnesses().into_iter().map(|w| w.raw_data()).collect();
    let mut signed = Vec::new();
    for (lock_hash, lock, indices) in groups {
        let first = &witnesses[indices[0]];
        if first.is_empty() {
            continue;
        }
        let witness = WitnessArgs::from_slice(first).expect("first witness is WitnessArgs");
        let signature = witness.lock().to_opt().expect("lock is set").raw_data();
        let zeroed = witness
            .as_builder()
            .lock(Some(Bytes::from(vec![0u8; 65])).pack())
            .build()
            .as_bytes();

        let mut blake2b = new_blake2b();
        blake2b.update(tx.hash().as_slice());
        let digested = std::iter::once(&zeroed)
            .chain(indices[1..].iter().map(|&i| &witnesses[i]))
            .chain(witnesses[inputs_len..].iter());
        for w in digested {
            blake2b.update(&(w.len() as u64).to_le_bytes());
            blake2b.update(w);
        }
        let mut message = [0u8; 32];
        blake2b.finalize(&mut message);

        let pubkey = Signature::from_slice(&signature)
            .expect("65 byte signature")
            .recover(&H256(message))
            .expect("signature recovers");
        assert_eq!(
            &blake2b_256(pubkey.serialize())[..20],
            &lock.args().raw_data()[..],
            "signature of lock {:#x} does not verify over inputs {:?}",
            lock_hash,
            indices
        );
        signed.push(lock_hash);
    }
    signed
}

/// Number of witnesses carrying a non-empty lock.
pub fn signature_count(tx: &TransactionView) -> usize {
    tx.witnesses()
        .into_iter()
        .filter_map(|w| WitnessArgs::from_slice(&w.raw_data()).ok())
        .filter(|w| {
            w.lock()
                .to_opt()
                .map_or(false, |lock| !lock.raw_data().is_empty())
        })
        .count()
}
