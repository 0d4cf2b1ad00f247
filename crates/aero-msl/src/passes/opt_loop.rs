//! Unrolls loops that can only run once: the body ends in an unconditional `break` and nothing
//! else in it jumps to this loop's header or exit.

use aero_msl_ir::{CfNode, InstrKind, JumpKind, LoopNode, Shader};

use super::starts_with_phi;

/// Whether `list` contains a `break` or `continue` bound to the enclosing loop. Nested loops
/// bind their own jumps and are not searched.
fn has_loop_jump(list: &[CfNode]) -> bool {
    list.iter().any(|node| match node {
        CfNode::Block(block) => block.instrs.iter().any(|instr| {
            matches!(
                instr.kind,
                InstrKind::Jump {
                    jump: JumpKind::Break | JumpKind::Continue
                }
            )
        }),
        CfNode::If(node) => has_loop_jump(&node.then_list) || has_loop_jump(&node.else_list),
        CfNode::Loop(_) => false,
    })
}

fn runs_once(node: &LoopNode) -> bool {
    if node.has_continue_construct || starts_with_phi(&node.body) {
        return false;
    }
    let Some((CfNode::Block(last), rest)) = node.body.split_last() else {
        return false;
    };
    let Some((jump, before)) = last.instrs.split_last() else {
        return false;
    };
    matches!(
        jump.kind,
        InstrKind::Jump {
            jump: JumpKind::Break
        }
    ) && !before.iter().any(|i| i.is_jump())
        && !has_loop_jump(rest)
}

fn unroll_list(list: &mut Vec<CfNode>) -> bool {
    let mut changed = false;
    let mut i = 0;
    while i < list.len() {
        let unrolled = match &mut list[i] {
            CfNode::If(node) => {
                changed |= unroll_list(&mut node.then_list);
                changed |= unroll_list(&mut node.else_list);
                None
            }
            CfNode::Loop(node) => {
                changed |= unroll_list(&mut node.body);
                if runs_once(node) {
                    let mut body = std::mem::take(&mut node.body);
                    if let Some(CfNode::Block(last)) = body.last_mut() {
                        last.instrs.pop();
                    }
                    Some(body)
                } else {
                    None
                }
            }
            CfNode::Block(_) => None,
        };
        match unrolled {
            Some(body) => {
                let n = body.len();
                list.splice(i..=i, body);
                changed = true;
                i += n;
            }
            None => i += 1,
        }
    }
    changed
}

pub fn run(shader: &mut Shader) -> bool {
    unroll_list(&mut shader.entry.body)
}
