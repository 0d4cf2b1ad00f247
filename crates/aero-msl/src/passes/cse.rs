//! Block-local common subexpression elimination.
//!
//! Pure ALU ops, constants and system-value loads with identical operands are merged into the
//! first occurrence in the block; the duplicates are left for DCE.

use hashbrown::HashMap;

use aero_msl_ir::{AluOp, DefId, InstrKind, IntrinsicOp, Shader};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Alu {
        op: AluOp,
        bit_size: u8,
        num_components: u8,
        srcs: Vec<(DefId, [u8; 4])>,
    },
    Const {
        bit_size: u8,
        values: Vec<u64>,
    },
    SystemValue {
        op: IntrinsicOp,
        bit_size: u8,
        num_components: u8,
    },
}

fn key(kind: &InstrKind) -> Option<(Key, DefId)> {
    match kind {
        InstrKind::Alu(alu) => {
            let mut srcs: Vec<_> = alu.srcs.iter().map(|s| (s.src, s.swizzle)).collect();
            if alu.op.is_commutative() && srcs.len() == 2 {
                srcs.sort();
            }
            Some((
                Key::Alu {
                    op: alu.op,
                    bit_size: alu.def.bit_size,
                    num_components: alu.def.num_components,
                    srcs,
                },
                alu.def.id,
            ))
        }
        InstrKind::LoadConst(load) => Some((
            Key::Const {
                bit_size: load.def.bit_size,
                values: load.values.clone(),
            },
            load.def.id,
        )),
        InstrKind::Intrinsic(intr) if intr.op.system_value().is_some() => {
            let def = intr.def?;
            Some((
                Key::SystemValue {
                    op: intr.op,
                    bit_size: def.bit_size,
                    num_components: def.num_components,
                },
                def.id,
            ))
        }
        _ => None,
    }
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let mut duplicates = Vec::new();
    func.for_each_block(&mut |block| {
        let mut seen: HashMap<Key, DefId> = HashMap::new();
        for instr in &block.instrs {
            let Some((key, def)) = key(&instr.kind) else {
                continue;
            };
            match seen.get(&key) {
                Some(&first) => duplicates.push((def, first)),
                None => {
                    seen.insert(key, def);
                }
            }
        }
    });

    let mut changed = false;
    for (dup, first) in duplicates {
        changed |= func.rewrite_uses(dup, first);
    }
    changed
}
