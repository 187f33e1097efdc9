use ckb_types::{packed::Script, prelude::*, H256};

use crate::error::GroupError;
use crate::plan::InputGroup;
use crate::rpc::LiveCell;

/// Inputs verified together by one lock script.
///
/// CKB runs a lock once per distinct lock hash, over every input carrying
/// that hash, so the indices need not be contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockGroup {
    pub lock: Script,
    pub lock_hash: H256,
    pub input_indices: Vec<usize>,
    pub sign: bool,
}

impl LockGroup {
    pub fn new(lock: Script, input_indices: Vec<usize>, sign: bool) -> Self {
        let lock_hash = lock.calc_script_hash().unpack();
        Self {
            lock,
            lock_hash,
            input_indices,
            sign,
        }
    }

    pub fn first_index(&self) -> Option<usize> {
        self.input_indices.first().copied()
    }
}

/// Splits the inputs into lock groups, ordered by first appearance.
///
/// `cells` follows the flattened out points of `groups`. A signed input group
/// must stay under a single lock, and a lock is either signed everywhere or
/// nowhere. Signed input groups sharing a lock collapse into one group, which
/// gets a single signature.
pub fn group_by_lock(
    groups: &[InputGroup],
    cells: &[LiveCell],
) -> Result<Vec<LockGroup>, GroupError> {
    let flags = groups.iter().enumerate().flat_map(|(config_index, group)| {
        group
            .out_points
            .iter()
            .map(move |_| (config_index, group.sign))
    });

    let mut signed_locks: Vec<(usize, H256)> = Vec::new();
    let mut lock_groups: Vec<LockGroup> = Vec::new();
    for (index, ((config_index, sign), cell)) in flags.zip(cells).enumerate() {
        let lock = cell.output.lock();
        let lock_hash: H256 = lock.calc_script_hash().unpack();

        if sign {
            match signed_locks.iter().find(|(i, _)| *i == config_index) {
                Some((_, expected)) if *expected != lock_hash => {
                    return Err(GroupError::MixedLocks(config_index));
                }
                Some(_) => {}
                None => signed_locks.push((config_index, lock_hash.clone())),
            }
        }

        match lock_groups
            .iter_mut()
            .find(|group| group.lock_hash == lock_hash)
        {
            Some(group) if group.sign != sign => {
                return Err(GroupError::MixedSigning(lock_hash));
            }
            Some(group) => group.input_indices.push(index),
            None => lock_groups.push(LockGroup {
                lock,
                lock_hash,
                input_indices: vec![index],
                sign,
            }),
        }
    }
    Ok(lock_groups)
}
