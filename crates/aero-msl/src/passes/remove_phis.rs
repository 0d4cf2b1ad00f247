//! Removes phis that merge a single value.

use aero_msl_ir::{DefId, InstrKind, Phi, Shader};

/// The one value a phi selects, ignoring self-references from loop back edges.
fn trivial_value(phi: &Phi) -> Option<DefId> {
    let mut value = None;
    for src in &phi.srcs {
        if src.src == phi.def.id {
            continue;
        }
        match value {
            None => value = Some(src.src),
            Some(v) if v == src.src => {}
            Some(_) => return None,
        }
    }
    value
}

pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let mut trivial = Vec::new();
    func.for_each_instr(&mut |instr| {
        if let InstrKind::Phi(phi) = &instr.kind {
            if let Some(value) = trivial_value(phi) {
                trivial.push((phi.def.id, value));
            }
        }
    });
    if trivial.is_empty() {
        return false;
    }

    for &(phi, value) in &trivial {
        func.rewrite_uses(phi, value);
    }
    func.for_each_block_mut(&mut |block| {
        block.instrs.retain(|instr| match &instr.kind {
            InstrKind::Phi(phi) => !trivial.iter().any(|&(id, _)| id == phi.def.id),
            _ => true,
        });
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use aero_msl_ir::{Builder, ShaderStage, SizedType};

    #[test]
    fn same_value_on_both_edges_is_forwarded() {
        let mut b = Builder::new("main");
        let v = b.imm_u32(7);
        let cond = b.imm_bool(true);
        b.begin_if(cond);
        let then_block = b.current_block_id();
        b.begin_else().unwrap();
        let else_block = b.current_block_id();
        b.end_if().unwrap();
        let merged = b.phi(32, 1, &[(then_block, v), (else_block, v)]);
        b.store_output(merged, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(run(&mut shader));
        assert!(shader.entry.instrs().iter().all(|i| !i.is_phi()));
        assert!(shader.entry.instrs().iter().any(|i| i.srcs().first() == Some(&v)));
        assert!(!run(&mut shader));
    }

    #[test]
    fn distinct_values_are_kept() {
        let mut b = Builder::new("main");
        let cond = b.imm_bool(true);
        b.begin_if(cond);
        let a = b.imm_u32(1);
        let then_block = b.current_block_id();
        b.begin_else().unwrap();
        let c = b.imm_u32(2);
        let else_block = b.current_block_id();
        b.end_if().unwrap();
        let merged = b.phi(32, 1, &[(then_block, a), (else_block, c)]);
        b.store_output(merged, 0, SizedType::uint32());
        let mut shader = Shader::new(ShaderStage::Vertex, b.finish().unwrap());

        assert!(!run(&mut shader));
    }
}
