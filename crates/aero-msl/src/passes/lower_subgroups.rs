//! Rewrites subgroup operations into the forms Metal's SIMD-group functions accept.
//!
//! - `vote_any(b)` becomes `ballot(b) != 0` and `vote_all(b)` becomes `ballot(!b) == 0`;
//! - cross-lane data ops never see 1-bit values: boolean operands are widened with `b2b32` and
//!   boolean results are narrowed back with `b2b1`.

use aero_msl_ir::{
    AluInstr, AluOp, AluSrc, Def, DefId, Function, Instr, InstrKind, IntrinsicIndices,
    IntrinsicInstr, IntrinsicOp, LoadConst, Shader,
};
use hashbrown::HashMap;

use super::{def_shapes, rewrite_blocks};

fn alu(func: &mut Function, op: AluOp, def: Def, srcs: &[DefId]) -> Instr {
    func.alloc_instr(InstrKind::Alu(AluInstr {
        op,
        def,
        srcs: srcs.iter().copied().map(AluSrc::new).collect(),
    }))
}

fn ballot(func: &mut Function, predicate: DefId) -> Instr {
    let def = func.alloc_def(64, 1);
    func.alloc_instr(InstrKind::Intrinsic(IntrinsicInstr {
        op: IntrinsicOp::Ballot,
        srcs: vec![predicate],
        def: Some(def),
        index: IntrinsicIndices::default(),
    }))
}

fn lower_vote(func: &mut Function, intr: IntrinsicInstr, out: &mut Vec<Instr>) -> bool {
    let (Some(def), Some(&predicate)) = (intr.def, intr.srcs.first()) else {
        out.push(func.alloc_instr(InstrKind::Intrinsic(intr)));
        return false;
    };
    let all = intr.op == IntrinsicOp::VoteAll;

    let predicate = if all {
        let not = func.alloc_def(1, 1);
        out.push(alu(func, AluOp::Inot, not, &[predicate]));
        not.id
    } else {
        predicate
    };
    let mask = ballot(func, predicate);
    let mask_id = mask.def().map_or(predicate, |d| d.id);
    out.push(mask);

    let zero = func.alloc_def(64, 1);
    out.push(func.alloc_instr(InstrKind::LoadConst(LoadConst {
        def: zero,
        values: vec![0],
    })));
    let cmp = if all { AluOp::Ieq } else { AluOp::Ine };
    out.push(alu(func, cmp, def, &[mask_id, zero.id]));
    true
}

fn widen_booleans(
    func: &mut Function,
    mut intr: IntrinsicInstr,
    shapes: &HashMap<DefId, Def>,
    out: &mut Vec<Instr>,
) -> bool {
    let src_is_bool = intr
        .srcs
        .first()
        .and_then(|s| shapes.get(s))
        .is_some_and(|d| d.bit_size == 1);
    let narrow = intr.def.filter(|d| d.bit_size == 1);
    if !src_is_bool && narrow.is_none() {
        out.push(func.alloc_instr(InstrKind::Intrinsic(intr)));
        return false;
    }

    if src_is_bool {
        let src = intr.srcs[0];
        let comps = shapes.get(&src).map_or(1, |d| d.num_components);
        let wide = func.alloc_def(32, comps);
        out.push(alu(func, AluOp::B2b32, wide, &[src]));
        intr.srcs[0] = wide.id;
    }
    if let Some(def) = narrow {
        let wide = func.alloc_def(32, def.num_components);
        intr.def = Some(wide);
        out.push(func.alloc_instr(InstrKind::Intrinsic(intr)));
        out.push(alu(func, AluOp::B2b1, def, &[wide.id]));
    } else {
        out.push(func.alloc_instr(InstrKind::Intrinsic(intr)));
    }
    true
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let shapes = def_shapes(func);
    rewrite_blocks(func, &mut |func, instr, out| match instr.kind {
        InstrKind::Intrinsic(intr)
            if matches!(intr.op, IntrinsicOp::VoteAny | IntrinsicOp::VoteAll) =>
        {
            lower_vote(func, intr, out)
        }
        InstrKind::Intrinsic(intr) if intr.op.is_subgroup_data_op() => {
            widen_booleans(func, intr, &shapes, out)
        }
        kind => {
            out.push(Instr { id: instr.id, kind });
            false
        }
    })
}
