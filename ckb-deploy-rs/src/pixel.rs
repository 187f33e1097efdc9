//! Offline checks for the pixel canvas type script and the payment path of
//! the pixel lock.
//!
//! A canvas cell carries 5 bytes of data: a two byte coordinate followed by
//! its colour. Its type args are the lock hash of the canvas owner; while an
//! input carries that lock the owner may do anything, otherwise every canvas
//! output must repaint a coordinate one of the canvas inputs already holds.
//!
//! A pixel lock without a signature in its first witness unlocks by payment:
//! its single input must be refunded at least 120% of its capacity under the
//! same lock, and the official lock must receive at least 10%.

use ckb_types::{
    bytes::Bytes,
    h256,
    packed::{CellOutput, Script},
    prelude::*,
    H256,
};

use crate::error::PixelError;
use crate::rpc::LiveCell;
use crate::script_group::LockGroup;

pub const OFFICIAL_LOCK_HASH: H256 =
    h256!("0x6a242b57227484e904b4e08ba96f19a623c367dcbd18675ec6f2a71a0ff4ec26");

const CANVAS_ARGS_LEN: usize = 32;
const CANVAS_DATA_LEN: usize = 5;
const COORDINATE_LEN: usize = 2;
const PIXEL_LOCK_ARGS_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRules {
    pub canvas_code_hash: H256,
    pub official_lock_hash: H256,
}

/// Lowest refund a pixel bought at `price` accepts.
pub fn min_refund(price: u64) -> Option<u64> {
    price.checked_add(price.checked_mul(2)? / 10)
}

fn script_hash(script: &Script) -> H256 {
    script.calc_script_hash().unpack()
}

impl PixelRules {
    fn is_canvas(&self, cell: &CellOutput) -> Option<Script> {
        cell.type_()
            .to_opt()
            .filter(|script| script.code_hash() == self.canvas_code_hash.pack())
    }

    /// Every check that applies to the transaction: the canvas rules for each
    /// canvas script it touches, and the payment rules for each unsigned lock.
    pub fn check(
        &self,
        lock_groups: &[LockGroup],
        inputs: &[LiveCell],
        outputs: &[CellOutput],
        outputs_data: &[Bytes],
    ) -> Result<(), PixelError> {
        self.check_canvas(inputs, outputs, outputs_data)?;
        for group in lock_groups.iter().filter(|group| !group.sign) {
            self.check_payment(group, inputs, outputs)?;
        }
        Ok(())
    }

    pub fn check_canvas(
        &self,
        inputs: &[LiveCell],
        outputs: &[CellOutput],
        outputs_data: &[Bytes],
    ) -> Result<(), PixelError> {
        let mut canvases: Vec<Script> = Vec::new();
        let touched = inputs
            .iter()
            .map(|cell| &cell.output)
            .chain(outputs.iter())
            .filter_map(|cell| self.is_canvas(cell));
        for script in touched {
            if !canvases.contains(&script) {
                canvases.push(script);
            }
        }

        let input_locks: Vec<H256> = inputs
            .iter()
            .map(|cell| script_hash(&cell.output.lock()))
            .collect();

        for canvas in &canvases {
            let canvas_hash = script_hash(canvas);
            let args = canvas.args().raw_data();
            if args.len() != CANVAS_ARGS_LEN {
                return Err(PixelError::CanvasArgs(canvas_hash, args.len()));
            }
            if input_locks.iter().any(|lock| lock.as_bytes() == &args[..]) {
                continue;
            }

            let in_group = |cell: &CellOutput| {
                cell.type_()
                    .to_opt()
                    .map_or(false, |script| script_hash(&script) == canvas_hash)
            };

            let mut coordinates = Vec::new();
            for (index, cell) in inputs.iter().enumerate() {
                if !in_group(&cell.output) {
                    continue;
                }
                if cell.data.len() != CANVAS_DATA_LEN {
                    return Err(PixelError::CanvasInputData {
                        index,
                        len: cell.data.len(),
                    });
                }
                coordinates.push(cell.data.slice(..COORDINATE_LEN));
            }

            for (index, (output, data)) in outputs.iter().zip(outputs_data).enumerate() {
                if !in_group(output) {
                    continue;
                }
                if data.len() != CANVAS_DATA_LEN {
                    return Err(PixelError::CanvasData {
                        index,
                        len: data.len(),
                    });
                }
                if !coordinates.iter().any(|c| c[..] == data[..COORDINATE_LEN]) {
                    return Err(PixelError::Coordinate(index));
                }
            }
        }
        Ok(())
    }

    pub fn check_payment(
        &self,
        group: &LockGroup,
        inputs: &[LiveCell],
        outputs: &[CellOutput],
    ) -> Result<(), PixelError> {
        if group.lock.args().raw_data().len() != PIXEL_LOCK_ARGS_LEN {
            return Err(PixelError::LockArgs(group.lock_hash.clone()));
        }
        let price = match group.input_indices.as_slice() {
            [index] => inputs
                .get(*index)
                .map(|cell| -> u64 { cell.output.capacity().unpack() })
                .unwrap_or_default(),
            indices => {
                return Err(PixelError::PaymentInputs(
                    group.lock_hash.clone(),
                    indices.len(),
                ))
            }
        };

        let capacity_to = |lock_hash: &H256| -> Vec<u64> {
            outputs
                .iter()
                .filter(|output| &script_hash(&output.lock()) == lock_hash)
                .map(|output| -> u64 { output.capacity().unpack() })
                .collect()
        };

        let refunds = capacity_to(&group.lock_hash);
        let refund = match refunds.as_slice() {
            [refund] => *refund,
            _ => {
                return Err(PixelError::RefundOutputs(
                    group.lock_hash.clone(),
                    refunds.len(),
                ))
            }
        };
        let required = min_refund(price).unwrap_or(u64::MAX);
        if refund < required {
            return Err(PixelError::Refund {
                lock: group.lock_hash.clone(),
                required,
                actual: refund,
            });
        }

        let official = capacity_to(&self.official_lock_hash)
            .into_iter()
            .fold(0u64, u64::saturating_add);
        if official < price / 10 {
            return Err(PixelError::OfficialFee {
                required: price / 10,
                actual: official,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system_scripts::SIGHASH_TYPE_HASH;
    use ckb_types::core::ScriptHashType;

    const CANVAS: H256 = H256([0x29; 32]);
    const PIXEL_LOCK: H256 = H256([0xe9; 32]);

    fn rules() -> PixelRules {
        PixelRules {
            canvas_code_hash: CANVAS,
            official_lock_hash: OFFICIAL_LOCK_HASH,
        }
    }

    fn script(code_hash: &H256, hash_type: ScriptHashType, args: &[u8]) -> Script {
        Script::new_builder()
            .code_hash(code_hash.pack())
            .hash_type(hash_type.into())
            .args(Bytes::copy_from_slice(args).pack())
            .build()
    }

    fn pixel_lock(n: u8) -> Script {
        script(&PIXEL_LOCK, ScriptHashType::Type, &[n; 20])
    }

    fn official_lock() -> Script {
        let args = hex::decode("edcda9513fa030ce4308e29245a22c022d0443bb").unwrap();
        script(&SIGHASH_TYPE_HASH, ScriptHashType::Type, &args)
    }

    fn canvas(args: &[u8]) -> Script {
        script(&CANVAS, ScriptHashType::Data, args)
    }

    fn cell(capacity: u64, lock: Script, type_: Option<Script>) -> CellOutput {
        CellOutput::new_builder()
            .capacity(capacity.pack())
            .lock(lock)
            .type_(type_.pack())
            .build()
    }

    fn live(output: CellOutput, data: &'static [u8]) -> LiveCell {
        LiveCell {
            output,
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn test_official_lock_hash_is_official_sighash_lock() {
        assert_eq!(script_hash(&official_lock()), OFFICIAL_LOCK_HASH);
    }

    #[test]
    fn test_min_refund() {
        assert_eq!(min_refund(150_0000_0000), Some(180_0000_0000));
        assert_eq!(min_refund(9), Some(10));
        assert_eq!(min_refund(u64::MAX), None);
    }

    #[test]
    fn test_payment_bounds() {
        let seller = pixel_lock(1);
        let group = LockGroup::new(seller.clone(), vec![0], false);
        let inputs = vec![live(cell(150_0000_0000, seller.clone(), None), b"")];
        let outputs = |refund: u64, fee: u64| {
            vec![
                cell(refund, seller.clone(), None),
                cell(fee, official_lock(), None),
            ]
        };

        assert_eq!(
            rules().check_payment(&group, &inputs, &outputs(180_0000_0000, 15_0000_0000)),
            Ok(())
        );
        assert_eq!(
            rules().check_payment(&group, &inputs, &outputs(179_9999_9999, 15_0000_0000)),
            Err(PixelError::Refund {
                lock: group.lock_hash.clone(),
                required: 180_0000_0000,
                actual: 179_9999_9999,
            })
        );
        assert_eq!(
            rules().check_payment(&group, &inputs, &outputs(180_0000_0000, 14_9999_9999)),
            Err(PixelError::OfficialFee {
                required: 15_0000_0000,
                actual: 14_9999_9999,
            })
        );
    }

    #[test]
    fn test_payment_pairs_one_input_with_one_refund() {
        let seller = pixel_lock(1);
        let inputs = vec![
            live(cell(100_0000_0000, seller.clone(), None), b""),
            live(cell(100_0000_0000, seller.clone(), None), b""),
        ];
        let outputs = vec![
            cell(120_0000_0000, seller.clone(), None),
            cell(120_0000_0000, seller.clone(), None),
            cell(20_0000_0000, official_lock(), None),
        ];
        let pair = LockGroup::new(seller.clone(), vec![0, 1], false);
        assert!(matches!(
            rules().check_payment(&pair, &inputs, &outputs),
            Err(PixelError::PaymentInputs(_, 2))
        ));
        let single = LockGroup::new(seller.clone(), vec![0], false);
        assert!(matches!(
            rules().check_payment(&single, &inputs, &outputs),
            Err(PixelError::RefundOutputs(_, 2))
        ));
        assert!(matches!(
            rules().check_payment(&single, &inputs, &outputs[2..]),
            Err(PixelError::RefundOutputs(_, 0))
        ));

        let short_args = LockGroup::new(
            script(&PIXEL_LOCK, ScriptHashType::Type, &[1; 8]),
            vec![0],
            false,
        );
        assert!(matches!(
            rules().check_payment(&short_args, &inputs, &outputs),
            Err(PixelError::LockArgs(_))
        ));
    }

    #[test]
    fn test_canvas_coordinates_outside_owner_mode() {
        let pixel = canvas(&[0xcd; 32]);
        let inputs = vec![live(
            cell(142_0000_0000, pixel_lock(1), Some(pixel.clone())),
            b"00222",
        )];
        let outputs = vec![cell(142_0000_0000, pixel_lock(2), Some(pixel.clone()))];

        assert_eq!(
            rules().check_canvas(&inputs, &outputs, &[Bytes::from_static(b"00999")]),
            Ok(())
        );
        assert_eq!(
            rules().check_canvas(&inputs, &outputs, &[Bytes::from_static(b"01222")]),
            Err(PixelError::Coordinate(0))
        );
        assert_eq!(
            rules().check_canvas(&inputs, &outputs, &[Bytes::from_static(b"0022")]),
            Err(PixelError::CanvasData { index: 0, len: 4 })
        );
        // a fresh pixel with no canvas input
        assert_eq!(
            rules().check_canvas(&[], &outputs, &[Bytes::from_static(b"00222")]),
            Err(PixelError::Coordinate(0))
        );
    }

    #[test]
    fn test_canvas_owner_may_paint_anywhere() {
        let owner = official_lock();
        let pixel = canvas(script_hash(&owner).as_bytes());
        let inputs = vec![live(cell(1000_0000_0000, owner.clone(), None), b"")];
        let outputs = vec![cell(142_0000_0000, owner, Some(pixel))];
        assert_eq!(
            rules().check_canvas(&inputs, &outputs, &[Bytes::from_static(b"00111")]),
            Ok(())
        );
    }

    #[test]
    fn test_canvas_args_must_be_a_hash() {
        let pixel = canvas(&[0xcd; 20]);
        let outputs = vec![cell(142_0000_0000, pixel_lock(2), Some(pixel.clone()))];
        assert_eq!(
            rules().check_canvas(&[], &outputs, &[Bytes::from_static(b"00111")]),
            Err(PixelError::CanvasArgs(script_hash(&pixel), 20))
        );
    }
}
