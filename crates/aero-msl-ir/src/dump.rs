use std::fmt::Write as _;

use crate::ir::{AluSrc, CfNode, Def, Function, Instr, InstrKind, IntrinsicIndices};
use crate::types::{Access, InterpMode, MemoryModes, Scope};

const SWIZZLE: [char; 4] = ['x', 'y', 'z', 'w'];

fn def_str(def: &Def) -> String {
    format!("{}: {}x{}", def.id, def.bit_size, def.num_components)
}

fn alu_src_str(src: &AluSrc, components: u8) -> String {
    let identity = (0..components).all(|i| src.swizzle[usize::from(i)] == i);
    if identity {
        src.src.to_string()
    } else {
        let swizzle: String = src.swizzle[..usize::from(components)]
            .iter()
            .map(|&c| SWIZZLE[usize::from(c & 3)])
            .collect();
        format!("{}.{swizzle}", src.src)
    }
}

fn indices_str(index: &IntrinsicIndices) -> String {
    let mut parts = Vec::new();
    if index.base != 0 {
        parts.push(format!("base={}", index.base));
    }
    if index.component != 0 {
        parts.push(format!("component={}", index.component));
    }
    if let Some(mask) = index.write_mask {
        parts.push(format!("write_mask={mask:#x}"));
    }
    if let Some(io) = index.io {
        parts.push(format!("location={}", io.location));
        if io.num_slots != 1 {
            parts.push(format!("num_slots={}", io.num_slots));
        }
    }
    if let Some(ty) = index.dest_type {
        parts.push(format!("dest_type={ty}"));
    }
    if let Some(ty) = index.src_type {
        parts.push(format!("src_type={ty}"));
    }
    if index.interp_mode != InterpMode::None {
        parts.push(format!("interp_mode={}", index.interp_mode));
    }
    if let Some(op) = index.atomic_op {
        parts.push(format!("atomic_op={op}"));
    }
    if let Some(op) = index.reduction_op {
        parts.push(format!("reduction_op={op}"));
    }
    if index.execution_scope != Scope::None {
        parts.push(format!("execution_scope={}", index.execution_scope));
    }
    if index.memory_scope != Scope::None {
        parts.push(format!("memory_scope={}", index.memory_scope));
    }
    if index.memory_modes != MemoryModes::empty() {
        parts.push(format!("memory_modes={:?}", index.memory_modes));
    }
    if let Some(dim) = index.image_dim {
        parts.push(format!("image_dim={dim}"));
    }
    if index.image_array {
        parts.push("image_array".to_owned());
    }
    if index.access != Access::None {
        parts.push(format!("access={}", index.access));
    }
    if index.binding != 0 {
        parts.push(format!("binding={}", index.binding));
    }
    if index.bit_size != 0 {
        parts.push(format!("bit_size={}", index.bit_size));
    }
    if index.num_components != 0 {
        parts.push(format!("num_components={}", index.num_components));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" {{{}}}", parts.join(", "))
    }
}

fn instr_str(instr: &Instr) -> String {
    match &instr.kind {
        InstrKind::Alu(alu) => {
            let srcs: Vec<String> = alu
                .srcs
                .iter()
                .enumerate()
                .map(|(i, s)| alu_src_str(s, alu.src_components(i)))
                .collect();
            format!("{} = {} {}", def_str(&alu.def), alu.op, srcs.join(", "))
        }
        InstrKind::Intrinsic(intr) => {
            let srcs: Vec<String> = intr.srcs.iter().map(|s| s.to_string()).collect();
            let prefix = intr
                .def
                .as_ref()
                .map(|d| format!("{} = ", def_str(d)))
                .unwrap_or_default();
            format!(
                "{prefix}@{} ({}){}",
                intr.op,
                srcs.join(", "),
                indices_str(&intr.index)
            )
        }
        InstrKind::Tex(tex) => {
            let srcs: Vec<String> = tex
                .srcs
                .iter()
                .map(|s| format!("{}: {}", s.kind, s.src))
                .collect();
            format!(
                "{} = tex.{} ({}) {{dim={}{}, coord_components={}, dest_type={}}}",
                def_str(&tex.def),
                tex.op,
                srcs.join(", "),
                tex.sampler_dim,
                if tex.is_array { ", array" } else { "" },
                tex.coord_components,
                tex.dest_type
            )
        }
        InstrKind::Jump { jump } => jump.to_string(),
        InstrKind::LoadConst(load) => {
            let values: Vec<String> = load.values.iter().map(|v| format!("{v:#x}")).collect();
            format!("{} = load_const ({})", def_str(&load.def), values.join(", "))
        }
        InstrKind::Undef { def } => format!("{} = undefined", def_str(def)),
        InstrKind::Phi(phi) => {
            let srcs: Vec<String> = phi
                .srcs
                .iter()
                .map(|s| format!("{}: {}", s.pred, s.src))
                .collect();
            format!("{} = phi {}", def_str(&phi.def), srcs.join(", "))
        }
    }
}

fn dump_list(out: &mut String, list: &[CfNode], depth: usize) {
    let pad = "    ".repeat(depth);
    for node in list {
        match node {
            CfNode::Block(block) => {
                let _ = writeln!(out, "{pad}{}:", block.id);
                for instr in &block.instrs {
                    let _ = writeln!(out, "{pad}    {}", instr_str(instr));
                }
            }
            CfNode::If(node) => {
                let _ = writeln!(out, "{pad}if {} {{", node.condition);
                dump_list(out, &node.then_list, depth + 1);
                let _ = writeln!(out, "{pad}}} else {{");
                dump_list(out, &node.else_list, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            CfNode::Loop(node) => {
                let _ = writeln!(out, "{pad}loop {{");
                dump_list(out, &node.body, depth + 1);
                let _ = writeln!(out, "{pad}}}");
            }
        }
    }
}

impl Function {
    /// Renders the function in a readable, line-oriented text form.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "fn {} {{", self.name);
        dump_list(&mut out, &self.body, 1);
        out.push_str("}\n");
        out
    }
}

impl std::fmt::Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dump())
    }
}
