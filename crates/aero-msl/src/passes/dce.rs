use aero_msl_ir::Shader;

/// Deletes side-effect-free instructions whose result is never used, until none remain.
pub fn run(shader: &mut Shader) -> bool {
    let func = &mut shader.entry;
    let mut changed = false;
    loop {
        let uses = func.use_counts();
        let mut removed = false;
        func.for_each_block_mut(&mut |block| {
            let before = block.instrs.len();
            block.instrs.retain(|instr| {
                let dead = instr.is_removable()
                    && instr
                        .def()
                        .is_some_and(|def| uses.get(&def.id).copied().unwrap_or(0) == 0);
                !dead
            });
            removed |= block.instrs.len() != before;
        });
        if !removed {
            return changed;
        }
        changed = true;
    }
}
