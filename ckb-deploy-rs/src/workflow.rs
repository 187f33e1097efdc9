use std::collections::HashSet;

use ckb_types::{
    core::TransactionView,
    packed::{CellOutput, OutPoint},
    prelude::*,
    H256,
};
use log::{debug, info};

use crate::draft::TransactionDraft;
use crate::error::{Error, GroupError, InputError, Result};
use crate::key::SigningKey;
use crate::plan::{DeployPlan, InputGroup};
use crate::rpc::{ChainClient, LiveCell};
use crate::script_group::{group_by_lock, LockGroup};
use crate::signer::sign_tx;
use crate::system_scripts::SystemScripts;

#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    pub out_points: Vec<OutPoint>,
    pub cells: Vec<LiveCell>,
    pub capacity: u64,
}

#[derive(Debug, Clone)]
pub struct Deployment {
    pub tx: TransactionView,
    pub hash: H256,
}

/// Looks every referenced cell up on chain. An empty reference list, an empty
/// group, a repeated outpoint or a cell that is not live all fail.
pub fn resolve_inputs<C: ChainClient + ?Sized>(
    client: &C,
    groups: &[InputGroup],
) -> Result<ResolvedInputs> {
    if groups.iter().all(|group| group.out_points.is_empty()) {
        return Err(InputError::NoInputs.into());
    }
    if let Some(index) = groups.iter().position(|group| group.out_points.is_empty()) {
        return Err(InputError::EmptyGroup(index).into());
    }

    let mut seen = HashSet::new();
    let mut out_points = Vec::new();
    let mut cells = Vec::new();
    let mut capacity = 0u64;
    for out_point in groups.iter().flat_map(|group| group.out_points.iter()) {
        if !seen.insert(out_point.clone()) {
            return Err(InputError::Duplicate(out_point.clone()).into());
        }
        let cell = client
            .live_cell(out_point)
            .map_err(|err| InputError::Rpc(out_point.clone(), err))?
            .ok_or_else(|| InputError::NotLive(out_point.clone()))?;
        let cell_capacity: u64 = cell.output.capacity().unpack();
        capacity = capacity
            .checked_add(cell_capacity)
            .ok_or(Error::CapacityOverflow)?;
        out_points.push(out_point.clone());
        cells.push(cell);
    }
    Ok(ResolvedInputs {
        out_points,
        cells,
        capacity,
    })
}

/// Lock groups of the resolved inputs. Every signed lock must carry the
/// signing key's blake160 as its args, or the signature cannot verify.
pub fn signing_groups(
    groups: &[InputGroup],
    resolved: &ResolvedInputs,
    key: &SigningKey,
) -> Result<Vec<LockGroup>> {
    let lock_groups = group_by_lock(groups, &resolved.cells)?;
    let owner_args = key.lock_args();
    if let Some(foreign) = lock_groups
        .iter()
        .find(|group| group.sign && group.lock.args().raw_data() != owner_args)
    {
        return Err(GroupError::NotOwned(foreign.lock_hash.clone()).into());
    }
    Ok(lock_groups)
}

/// Inputs must cover outputs plus fee, and every output must hold its own
/// occupied capacity.
pub fn check_capacity(draft: &TransactionDraft, input_capacity: u64, fee: u64) -> Result<()> {
    let outputs = draft.output_capacity().ok_or(Error::CapacityOverflow)?;
    let required = outputs.checked_add(fee).ok_or(Error::CapacityOverflow)?;
    if required > input_capacity {
        return Err(Error::Imbalance {
            inputs: input_capacity,
            outputs,
            fee,
        });
    }
    if let Some((index, capacity, occupied)) = draft.find_underfunded_output() {
        return Err(Error::InsufficientCapacity {
            index,
            capacity,
            occupied,
        });
    }
    Ok(())
}

/// Steps one to five: everything short of submission. The returned
/// transaction carries one signature per signed lock group.
pub fn build_transaction<C: ChainClient + ?Sized>(
    plan: &DeployPlan,
    client: &C,
) -> Result<TransactionView> {
    let tip = client.tip_block_number().map_err(Error::Connection)?;
    debug!("connected to node, tip block {}", tip);

    let scripts = SystemScripts::load(client)?;
    let owner = plan.key.lock_script(&scripts);
    info!(
        "owner lock args 0x{}, lock hash {:#x}",
        hex::encode(owner.args().raw_data()),
        owner.calc_script_hash()
    );

    let mut draft = TransactionDraft::new();
    draft.push_cell_dep(scripts.sighash_dep.clone());
    for cell_dep in &plan.cell_deps {
        draft.push_cell_dep(cell_dep.clone());
    }

    for output in &plan.outputs {
        let mut builder = CellOutput::new_builder()
            .capacity(output.capacity.pack())
            .lock(output.lock.resolve(&owner));
        if let Some(type_) = &output.type_ {
            builder = builder.type_(Some(type_.resolve(&owner)).pack());
        }
        draft.push_output(builder.build(), output.data.clone());
    }

    let resolved = resolve_inputs(client, &plan.input_groups)?;
    info!(
        "resolved {} input cells, {} shannons",
        resolved.cells.len(),
        resolved.capacity
    );

    let fee = match plan.change {
        Some(change) => {
            let outputs = draft.output_capacity().ok_or(Error::CapacityOverflow)?;
            let spent = outputs
                .checked_add(change.fee)
                .ok_or(Error::CapacityOverflow)?;
            let change_capacity =
                resolved
                    .capacity
                    .checked_sub(spent)
                    .ok_or(Error::Imbalance {
                        inputs: resolved.capacity,
                        outputs,
                        fee: change.fee,
                    })?;
            if change_capacity > 0 {
                debug!("change output {} shannons", change_capacity);
                let change_output = CellOutput::new_builder()
                    .capacity(change_capacity.pack())
                    .lock(owner.clone())
                    .build();
                draft.push_output(change_output, Default::default());
            }
            change.fee
        }
        None => 0,
    };
    check_capacity(&draft, resolved.capacity, fee)?;

    let lock_groups = signing_groups(&plan.input_groups, &resolved, &plan.key)?;
    debug!(
        "{} lock groups, {} signed",
        lock_groups.len(),
        lock_groups.iter().filter(|group| group.sign).count()
    );
    if let Some(rules) = &plan.pixel {
        rules.check(
            &lock_groups,
            &resolved.cells,
            draft.outputs(),
            draft.outputs_data(),
        )?;
    }

    draft.push_inputs(&resolved.out_points);
    for group in lock_groups {
        draft.push_lock_group(group);
    }

    let tx = sign_tx(draft.build(), draft.lock_groups(), &plan.key)?;
    info!(
        "built tx {:#x}: {} inputs, {} outputs",
        tx.hash(),
        tx.inputs().len(),
        tx.outputs().len()
    );
    Ok(tx)
}

pub fn submit<C: ChainClient + ?Sized>(client: &C, tx: &TransactionView) -> Result<H256> {
    let hash = client.send_transaction(tx).map_err(Error::Submission)?;
    info!("node accepted tx {:#x}", hash);
    Ok(hash)
}

/// The whole workflow: build, sign and submit.
pub fn deploy<C: ChainClient + ?Sized>(plan: &DeployPlan, client: &C) -> Result<Deployment> {
    let tx = build_transaction(plan, client)?;
    let hash = submit(client, &tx)?;
    Ok(Deployment { tx, hash })
}
