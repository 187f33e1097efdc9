use ckb_types::{bytes::Bytes, core::TransactionView, packed::WitnessArgs, prelude::*};
use log::debug;

use crate::draft::witness_at;
use crate::error::{Error, Result};
use crate::generate_sighash_all::generate_sighash_all;
use crate::key::SigningKey;
use crate::script_group::LockGroup;

/// Writes `signature` into the lock of witness `index`.
pub fn set_signature_by_index(
    tx: TransactionView,
    signature: &Bytes,
    index: usize,
) -> Result<TransactionView> {
    let witness = WitnessArgs::from_slice(&witness_at(&tx, index).raw_data())
        .map_err(|err| Error::Signing(format!("witness #{}: {}", index, err)))?;
    let signed = witness
        .as_builder()
        .lock(Some(signature.clone()).pack())
        .build();
    let mut witnesses: Vec<_> = tx.witnesses().into_iter().collect();
    witnesses[index] = signed.as_bytes().pack();
    Ok(tx.as_advanced_builder().set_witnesses(witnesses).build())
}

/// Signs one lock group: a single recoverable signature bound to the
/// group's first witness.
pub fn sign_lock_group(
    tx: TransactionView,
    group: &LockGroup,
    key: &SigningKey,
) -> Result<TransactionView> {
    let message = generate_sighash_all(&tx, &group.input_indices)?;
    let signature = key.sign(&message)?;
    debug!(
        "signed lock {:#x} inputs {:?} message 0x{}",
        group.lock_hash,
        group.input_indices,
        hex::encode(message)
    );
    let first_index = group
        .first_index()
        .ok_or_else(|| Error::Signing(format!("lock {:#x} has no inputs", group.lock_hash)))?;
    set_signature_by_index(tx, &Bytes::from(signature.serialize()), first_index)
}

/// Signs every group flagged for signing. Must run after the last input is
/// appended, since the message commits to the tx hash.
pub fn sign_tx(
    mut tx: TransactionView,
    groups: &[LockGroup],
    key: &SigningKey,
) -> Result<TransactionView> {
    for group in groups.iter().filter(|group| group.sign) {
        tx = sign_lock_group(tx, group, key)?;
    }
    Ok(tx)
}
