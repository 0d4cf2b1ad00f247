//! Removes control flow that can never matter.
//!
//! - an `if` on a constant condition is replaced by the branch it always takes;
//! - an `if` with two empty branches is dropped;
//! - instructions after a jump in the same block are unreachable and deleted.
//!
//! An `if` is only flattened when the node after it does not start with a phi, because the phi
//! names the branch blocks as predecessors.

use hashbrown::HashMap;

use aero_msl_ir::{cf_list_is_empty, CfNode, DefId, Shader};

use super::{constants, starts_with_phi};

fn truncate_after_jumps(list: &mut [CfNode]) -> bool {
    let mut changed = false;
    for node in list {
        match node {
            CfNode::Block(block) => {
                if let Some(pos) = block.instrs.iter().position(|i| i.is_jump()) {
                    if pos + 1 < block.instrs.len() {
                        block.instrs.truncate(pos + 1);
                        changed = true;
                    }
                }
            }
            CfNode::If(node) => {
                changed |= truncate_after_jumps(&mut node.then_list);
                changed |= truncate_after_jumps(&mut node.else_list);
            }
            CfNode::Loop(node) => changed |= truncate_after_jumps(&mut node.body),
        }
    }
    changed
}

fn simplify_list(list: &mut Vec<CfNode>, bools: &HashMap<DefId, bool>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < list.len() {
        let phi_follows = starts_with_phi(&list[i + 1..]);
        let replacement = match &mut list[i] {
            CfNode::If(node) => {
                changed |= simplify_list(&mut node.then_list, bools);
                changed |= simplify_list(&mut node.else_list, bools);
                if phi_follows {
                    None
                } else if let Some(&taken) = bools.get(&node.condition) {
                    let branch = if taken {
                        &mut node.then_list
                    } else {
                        &mut node.else_list
                    };
                    Some(std::mem::take(branch))
                } else if cf_list_is_empty(&node.then_list) && cf_list_is_empty(&node.else_list) {
                    Some(Vec::new())
                } else {
                    None
                }
            }
            CfNode::Loop(node) => {
                changed |= simplify_list(&mut node.body, bools);
                None
            }
            CfNode::Block(_) => None,
        };

        match replacement {
            Some(nodes) => {
                let n = nodes.len();
                list.splice(i..=i, nodes);
                changed = true;
                i += n;
            }
            None => i += 1,
        }
    }
    changed
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let bools: HashMap<DefId, bool> = constants(func)
        .into_values()
        .filter(|c| c.def.bit_size == 1 && c.def.num_components == 1)
        .map(|c| (c.def.id, c.component_bits(0) & 1 != 0))
        .collect();

    let mut changed = truncate_after_jumps(&mut func.body);
    changed |= simplify_list(&mut func.body, &bools);
    changed
}
