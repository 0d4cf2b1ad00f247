use aero_msl_ir::{Shader, SystemValues};

/// Records every system value the entry function loads in `info.system_values_read`.
///
/// Bits are only ever added: a caller may declare system values the program does not load.
pub fn run(shader: &mut Shader) -> bool {
    let mut read = SystemValues::empty();
    shader.entry.for_each_instr(&mut |instr| {
        if let Some(sv) = instr.as_intrinsic().and_then(|i| i.op.system_value()) {
            read |= sv;
        }
    });
    let before = shader.info.system_values_read;
    shader.info.system_values_read |= read;
    shader.info.system_values_read != before
}
