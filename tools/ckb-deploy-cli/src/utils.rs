use std::path::Path;

use anyhow::{anyhow, Error};
use ckb_deploy_rs::{system_scripts::SystemScripts, DeployConfig, DeployPlan, SigningKey};
use ckb_types::{core::TransactionView, H256};
use log::info;

pub(crate) fn load_plan(path: &Path) -> Result<DeployPlan, Error> {
    let plan = DeployConfig::load(path)?.into_plan()?;
    info!(
        "loaded {}: {} cell deps, {} outputs, {} inputs",
        path.display(),
        plan.cell_deps.len(),
        plan.outputs.len(),
        plan.input_count()
    );
    Ok(plan)
}

pub(crate) fn print_tx_json(tx: &TransactionView) -> Result<(), Error> {
    let json_tx = ckb_jsonrpc_types::TransactionView::from(tx.clone());
    println!("{}", serde_json::to_string_pretty(&json_tx)?);
    Ok(())
}

pub(crate) fn print_lock_info(key: &SigningKey) {
    // The dep group location does not affect the lock script itself.
    let lock = key.lock_script(&SystemScripts::from_dep_group(H256::default()));
    println!("lock args: 0x{}", hex::encode(key.lock_args()));
    println!("lock hash: {:#x}", lock.calc_script_hash());
}

pub(crate) fn print_plan_summary(plan: &DeployPlan) -> Result<(), Error> {
    let outputs = plan
        .output_capacity()
        .ok_or_else(|| anyhow!("output capacity overflows u64"))?;
    print_lock_info(&plan.key);
    println!("rpc url: {}", plan.rpc_url);
    println!("cell deps: {}", plan.cell_deps.len());
    for (i, output) in plan.outputs.iter().enumerate() {
        println!(
            "output #{}: {} shannons, {} data bytes",
            i,
            output.capacity,
            output.data.len()
        );
    }
    println!("output total: {} shannons", outputs);
    for (i, group) in plan.input_groups.iter().enumerate() {
        println!(
            "input group #{}: {} cells{}",
            i,
            group.out_points.len(),
            if group.sign { ", signed" } else { "" }
        );
    }
    if let Some(change) = plan.change {
        println!("change to owner, fee {} shannons", change.fee);
    }
    if let Some(rules) = &plan.pixel {
        println!(
            "pixel checks: canvas {:#x}, official lock {:#x}",
            rules.canvas_code_hash, rules.official_lock_hash
        );
    }
    Ok(())
}
