use ckb_types::{
    bytes::Bytes,
    core::{Capacity, TransactionBuilder, TransactionView},
    packed::{self, CellDep, CellInput, CellOutput, OutPoint, WitnessArgs},
    prelude::*,
};

use crate::key::SIGNATURE_SIZE;
use crate::script_group::LockGroup;

/// Transaction under construction.
///
/// Outputs and their data only enter through [`TransactionDraft::push_output`],
/// so the two sequences never disagree in length.
#[derive(Debug, Default, Clone)]
pub struct TransactionDraft {
    cell_deps: Vec<CellDep>,
    outputs: Vec<CellOutput>,
    outputs_data: Vec<Bytes>,
    inputs: Vec<CellInput>,
    witnesses: Vec<Bytes>,
    lock_groups: Vec<LockGroup>,
}

/// `WitnessArgs` with a zero-filled lock of signature size.
pub fn placeholder_witness() -> WitnessArgs {
    WitnessArgs::new_builder()
        .lock(Some(Bytes::from(vec![0u8; SIGNATURE_SIZE])).pack())
        .build()
}

impl TransactionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_cell_dep(&mut self, cell_dep: CellDep) -> &mut Self {
        self.cell_deps.push(cell_dep);
        self
    }

    pub fn push_output(&mut self, output: CellOutput, data: Bytes) -> &mut Self {
        self.outputs.push(output);
        self.outputs_data.push(data);
        self
    }

    /// Appends inputs, each with an empty witness.
    pub fn push_inputs(&mut self, out_points: &[OutPoint]) -> &mut Self {
        for out_point in out_points {
            self.inputs.push(CellInput::new(out_point.clone(), 0));
            self.witnesses.push(Bytes::new());
        }
        self
    }

    /// Registers a lock group over inputs already pushed. The first input of
    /// a signed group gets the placeholder witness.
    pub fn push_lock_group(&mut self, group: LockGroup) -> &mut Self {
        if group.sign {
            if let Some(witness) = group
                .first_index()
                .and_then(|index| self.witnesses.get_mut(index))
            {
                *witness = placeholder_witness().as_bytes();
            }
        }
        self.lock_groups.push(group);
        self
    }

    pub fn cell_deps(&self) -> &[CellDep] {
        &self.cell_deps
    }

    pub fn outputs(&self) -> &[CellOutput] {
        &self.outputs
    }

    pub fn outputs_data(&self) -> &[Bytes] {
        &self.outputs_data
    }

    pub fn inputs(&self) -> &[CellInput] {
        &self.inputs
    }

    pub fn lock_groups(&self) -> &[LockGroup] {
        &self.lock_groups
    }

    pub fn output_capacity(&self) -> Option<u64> {
        self.outputs.iter().try_fold(0u64, |acc, output| {
            let capacity: u64 = output.capacity().unpack();
            acc.checked_add(capacity)
        })
    }

    /// First output whose capacity cannot hold its own lock, type and data.
    pub fn find_underfunded_output(&self) -> Option<(usize, u64, u64)> {
        self.outputs
            .iter()
            .zip(self.outputs_data.iter())
            .enumerate()
            .find_map(|(index, (output, data))| {
                let capacity: u64 = output.capacity().unpack();
                let occupied = Capacity::bytes(data.len())
                    .and_then(|data_capacity| output.occupied_capacity(data_capacity))
                    .map(|occupied| occupied.as_u64())
                    .unwrap_or(u64::MAX);
                (capacity < occupied).then_some((index, capacity, occupied))
            })
    }

    pub fn build(&self) -> TransactionView {
        TransactionBuilder::default()
            .cell_deps(self.cell_deps.clone())
            .outputs(self.outputs.clone())
            .outputs_data(self.outputs_data.iter().map(|data| data.pack()))
            .inputs(self.inputs.clone())
            .witnesses(self.witnesses.iter().map(|w| w.pack()))
            .build()
    }
}

pub(crate) fn witness_at(tx: &TransactionView, index: usize) -> packed::Bytes {
    tx.witnesses().get(index).unwrap_or_default()
}
