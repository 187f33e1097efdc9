use ckb_hash::new_blake2b;
use ckb_types::{bytes::Bytes, core::TransactionView, packed::WitnessArgs, prelude::*};

use crate::draft::witness_at;
use crate::error::{Error, Result};
use crate::key::SIGNATURE_SIZE;

/// Sighash-all message for the inputs at `input_indices`, which must list a
/// whole lock group in input order.
///
/// Digest order: tx hash, the group's first witness with its lock zeroed,
/// the remaining witnesses of the group, then every witness past the last
/// input. Each witness is preceded by its length as u64 little endian.
pub fn generate_sighash_all(tx: &TransactionView, input_indices: &[usize]) -> Result<[u8; 32]> {
    let inputs_len = tx.inputs().len();
    let first_index = match input_indices.first() {
        Some(&index) if input_indices.iter().all(|&i| i < inputs_len) => index,
        _ => {
            return Err(Error::Signing(format!(
                "input group {:?} out of {} inputs",
                input_indices, inputs_len
            )))
        }
    };

    // Load witness of first input.
    let first = witness_at(tx, first_index).raw_data();
    let witness = WitnessArgs::from_slice(&first)
        .map_err(|err| Error::Signing(format!("witness #{}: {}", first_index, err)))?;
    let zero_lock = Bytes::from(vec![0u8; SIGNATURE_SIZE]);
    let witness_for_digest = witness.as_builder().lock(Some(zero_lock).pack()).build();

    let mut blake2b = new_blake2b();
    blake2b.update(tx.hash().as_slice());
    let witness_len = witness_for_digest.as_bytes().len() as u64;
    blake2b.update(&witness_len.to_le_bytes());
    blake2b.update(&witness_for_digest.as_bytes());

    // Digest same group witnesses.
    for &i in &input_indices[1..] {
        let witness = witness_at(tx, i).raw_data();
        blake2b.update(&(witness.len() as u64).to_le_bytes());
        blake2b.update(&witness);
    }

    // Digest witnesses that not covered by inputs.
    for i in inputs_len..tx.witnesses().len() {
        let witness = witness_at(tx, i).raw_data();
        blake2b.update(&(witness.len() as u64).to_le_bytes());
        blake2b.update(&witness);
    }

    let mut message = [0u8; 32];
    blake2b.finalize(&mut message);
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::TransactionDraft;
    use crate::script_group::LockGroup;
    use ckb_types::{core::ScriptHashType, packed::OutPoint, packed::Script, H256};

    fn lock(n: u8) -> Script {
        Script::new_builder()
            .code_hash(H256([n; 32]).pack())
            .hash_type(ScriptHashType::Type.into())
            .build()
    }

    // inputs 0 and 2 share a signed lock, input 1 is unsigned
    fn draft_with_scattered_group() -> TransactionDraft {
        let mut draft = TransactionDraft::new();
        draft.push_inputs(&[
            OutPoint::new(H256([1u8; 32]).pack(), 0),
            OutPoint::new(H256([2u8; 32]).pack(), 3),
            OutPoint::new(H256([3u8; 32]).pack(), 0),
        ]);
        draft
            .push_lock_group(LockGroup::new(lock(1), vec![0, 2], true))
            .push_lock_group(LockGroup::new(lock(2), vec![1], false));
        draft
    }

    fn with_witness(tx: &TransactionView, index: usize, witness: Bytes) -> TransactionView {
        let mut witnesses: Vec<_> = tx.witnesses().into_iter().collect();
        witnesses[index] = witness.pack();
        tx.as_advanced_builder().set_witnesses(witnesses).build()
    }

    #[test]
    fn test_message_ignores_current_lock() {
        let tx = draft_with_scattered_group().build();
        let message = generate_sighash_all(&tx, &[0, 2]).unwrap();

        // A filled-in lock must not change the message.
        let signed_witness = WitnessArgs::new_builder()
            .lock(Some(Bytes::from(vec![0x5au8; SIGNATURE_SIZE])).pack())
            .build();
        let tx2 = with_witness(&tx, 0, signed_witness.as_bytes());
        assert_eq!(generate_sighash_all(&tx2, &[0, 2]).unwrap(), message);
    }

    #[test]
    fn test_message_covers_group_witnesses_only() {
        let tx = draft_with_scattered_group().build();
        let message = generate_sighash_all(&tx, &[0, 2]).unwrap();

        let tx2 = with_witness(&tx, 2, Bytes::from_static(b"extra"));
        assert_ne!(generate_sighash_all(&tx2, &[0, 2]).unwrap(), message);

        // input 1 belongs to another lock
        let tx3 = with_witness(&tx, 1, Bytes::from_static(b"extra"));
        assert_eq!(generate_sighash_all(&tx3, &[0, 2]).unwrap(), message);

        let tx4 = tx.as_advanced_builder().output_data(Bytes::new().pack()).build();
        assert_ne!(generate_sighash_all(&tx4, &[0, 2]).unwrap(), message);
    }

    #[test]
    fn test_group_without_placeholder_is_rejected() {
        let tx = draft_with_scattered_group().build();
        // Unsigned groups carry an empty witness, which is not a WitnessArgs.
        assert!(matches!(
            generate_sighash_all(&tx, &[1]),
            Err(Error::Signing(_))
        ));
        assert!(generate_sighash_all(&tx, &[0, 3]).is_err());
        assert!(generate_sighash_all(&tx, &[]).is_err());
    }
}
