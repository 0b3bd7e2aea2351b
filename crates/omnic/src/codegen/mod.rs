//! Top-level codegen module
//!
//! `Compiler` holds the program-wide symbol tables (classes, interfaces,
//! enums, aliases, externs, declared functions), the string pool, and the
//! list of compiled function scopes. The pipeline is organized across
//! submodules:
//! - `expr` : expression lowering
//! - `stmt` : statement lowering
//!
//! Compilation runs as a fixed sequence of passes over the top-level
//! statements (see [`Compiler::compile_program`]) so forward references
//! between classes, between functions, and from methods to
//! not-yet-lowered sibling classes all resolve. The final module text is
//! assembled by [`Compiler::generate_wat`].

use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;

use omni_ast::{BlockStmt, ClassDecl, Expr, Program, Stmt};

use crate::runtime;
use crate::symbols::{
    ClassSymbol, EnumSymbol, ExternSymbol, FieldInfo, FunctionScope, InterfaceMethod,
    InterfaceSymbol, MethodInfo, Symbol,
};
use crate::types::{DataType, resolve_type};

pub mod expr;
pub mod stmt;

/// Shadow-stack region base; each frame's window grows upward from here.
pub const SHADOW_STACK_BASE: i32 = 1024;
/// First byte of the static data segment holding interned strings.
pub const STATIC_DATA_BASE: i32 = 9216;
/// First byte of the heap; the collector ignores pointers below this.
pub const HEAP_BASE: i32 = 10240;
/// Memory cell holding the heap bump pointer, advanced atomically.
pub const HEAP_PTR_CELL: i32 = 1020;
/// User classes get type ids from here; 0-9 are reserved for builtins.
const FIRST_CLASS_TYPE_ID: i32 = 10;

/// Build target; decides imports, the stdlib surface, and whether the
/// emitted collector actually sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Browser,
    Wasi,
}

impl std::str::FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "browser" => Ok(Target::Browser),
            "wasi" => Ok(Target::Wasi),
            other => Err(anyhow!("unknown target: {} (expected browser or wasi)", other)),
        }
    }
}

/// Converts the AST into WAT.
pub struct Compiler {
    target: Target,
    /// Compiled function scopes in emit order.
    functions: Vec<FunctionScope>,
    /// Import lines produced by `declare` statements (browser target).
    imports: Vec<String>,
    /// Interned strings in insertion order with their data offsets.
    string_pool: Vec<(String, i32)>,
    string_offsets: HashMap<String, i32>,
    next_data_offset: i32,
    /// Classes in declaration order; linear searches resolve first-match.
    classes: Vec<ClassSymbol>,
    class_index: HashMap<String, usize>,
    interfaces: Vec<InterfaceSymbol>,
    enums: Vec<EnumSymbol>,
    aliases: HashMap<String, String>,
    externs: HashMap<String, ExternSymbol>,
    /// Top-level functions with their resolved parameter types.
    declared_fns: HashMap<String, Vec<DataType>>,
    next_type_id: i32,
}

impl Compiler {
    pub fn new(target: Target) -> Self {
        Compiler {
            target,
            functions: Vec::new(),
            imports: Vec::new(),
            string_pool: Vec::new(),
            string_offsets: HashMap::new(),
            next_data_offset: STATIC_DATA_BASE,
            classes: Vec::new(),
            class_index: HashMap::new(),
            interfaces: Vec::new(),
            enums: Vec::new(),
            aliases: HashMap::new(),
            externs: HashMap::new(),
            declared_fns: HashMap::new(),
            next_type_id: FIRST_CLASS_TYPE_ID,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub(crate) fn class(&self, name: &str) -> Option<&ClassSymbol> {
        self.class_index.get(name).map(|i| &self.classes[*i])
    }

    pub(crate) fn resolve(&self, spelling: &str) -> DataType {
        resolve_type(spelling, &self.aliases)
    }

    /// Interns a string literal, assigning it a static-data offset on
    /// first sight. Subsequent occurrences share the offset.
    pub(crate) fn intern(&mut self, s: &str) -> i32 {
        if let Some(off) = self.string_offsets.get(s) {
            return *off;
        }
        let off = self.next_data_offset;
        self.string_offsets.insert(s.to_string(), off);
        self.string_pool.push((s.to_string(), off));
        self.next_data_offset += s.len() as i32 + 1;
        off
    }

    /// Runs the declaration-order pass pipeline over the program.
    pub fn compile_program(&mut self, program: &Program) -> Result<()> {
        // 1. Externs
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Declare(d) = stmt {
                let mut params = String::new();
                for _ in &d.params {
                    params.push_str(" (param i32)");
                }
                let result = if d.return_type != "void" && !d.return_type.is_empty() {
                    " (result i32)"
                } else {
                    ""
                };
                self.imports.push(format!(
                    "  (import \"env\" \"{0}\" (func ${0}{1}{2}))",
                    d.name.name, params, result
                ));
                self.externs.insert(
                    d.name.name.clone(),
                    ExternSymbol {
                        name: d.name.name.clone(),
                        param_count: d.params.len(),
                        return_type: d.return_type.clone(),
                    },
                );
            }
        }

        // 2. Type aliases, resolved lazily
        for stmt in unwrapped(&program.statements) {
            if let Stmt::TypeAlias(t) = stmt {
                self.aliases
                    .insert(t.name.name.clone(), t.target.clone());
            }
        }

        // 3. Enums
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Enum(e) = stmt {
                self.build_enum(e)?;
            }
        }

        // 4. Interfaces
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Interface(i) = stmt {
                let methods = i
                    .methods
                    .iter()
                    .map(|m| InterfaceMethod {
                        name: m.name.clone(),
                        arity: m.params.len(),
                        return_type: m.return_type.clone(),
                    })
                    .collect();
                self.interfaces.push(InterfaceSymbol {
                    name: i.name.name.clone(),
                    methods,
                });
            }
        }

        // 5. Class tables: type ids, layout, shallow inheritance
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Class(c) = stmt {
                self.define_class(c)?;
            }
        }

        // 6. Method bodies
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Class(c) = stmt {
                self.lower_class_methods(c)?;
            }
        }

        // 7. Interface conformance
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Class(c) = stmt {
                self.check_conformance(c)?;
            }
        }

        // 8. Top-level function signatures
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Expr(es) = stmt
                && let Expr::Function(f) = &es.expr
            {
                if f.name.is_empty() {
                    bail!("top-level function requires a name");
                }
                let params = f
                    .params
                    .iter()
                    .map(|p| self.resolve(&p.ty))
                    .collect::<Vec<_>>();
                self.declared_fns.insert(f.name.clone(), params);
            }
        }

        // 9. Function bodies
        for stmt in unwrapped(&program.statements) {
            if let Stmt::Expr(es) = stmt
                && let Expr::Function(f) = &es.expr
            {
                let params: Vec<(String, DataType)> = f
                    .params
                    .iter()
                    .map(|p| (p.name.name.clone(), self.resolve(&p.ty)))
                    .collect();
                self.lower_function(&f.name, params, &f.body, None)?;
            }
        }

        Ok(())
    }

    fn build_enum(&mut self, decl: &omni_ast::EnumDecl) -> Result<()> {
        if self.enums.iter().any(|e| e.name == decl.name.name) {
            bail!("duplicate enum: {}", decl.name.name);
        }
        let mut members = Vec::new();
        let mut counter: i32 = 0;
        for member in &decl.members {
            if let Some(value) = &member.value {
                match value {
                    Expr::Int(lit) => counter = lit.value as i32,
                    _ => bail!(
                        "non-literal enum initialiser for {}.{}",
                        decl.name.name,
                        member.name.name
                    ),
                }
            }
            members.push((member.name.name.clone(), counter));
            counter += 1;
        }
        self.enums.push(EnumSymbol {
            name: decl.name.name.clone(),
            members,
        });
        Ok(())
    }

    /// Builds a class symbol: assigns the type id, inherits the parent's
    /// fields and methods shallowly, then lays out own fields after the
    /// parent's size.
    fn define_class(&mut self, decl: &ClassDecl) -> Result<()> {
        let name = decl.name.name.clone();
        let type_id = self.next_type_id;
        self.next_type_id += 1;

        let mut fields: Vec<FieldInfo> = Vec::new();
        let mut methods: Vec<MethodInfo> = Vec::new();
        let mut parent = None;
        let mut offset = 0;

        if let Some(p) = &decl.parent {
            let psym = self
                .class(&p.name)
                .ok_or_else(|| anyhow!("undefined parent class: {}", p.name))?;
            fields = psym.fields.clone();
            methods = psym.methods.clone();
            offset = psym.size;
            parent = Some(p.name.clone());
        }

        for field in &decl.fields {
            let ty = self.resolve(&field.ty);
            fields.push(FieldInfo {
                name: field.name.name.clone(),
                offset,
                ty,
            });
            offset += 4;
        }

        for method in &decl.methods {
            let mangled = format!("{}_{}", name, method.name);
            match methods.iter_mut().find(|m| m.name == method.name) {
                // Overrides replace the inherited entry in place
                Some(entry) => entry.mangled = mangled,
                None => methods.push(MethodInfo {
                    name: method.name.clone(),
                    mangled,
                }),
            }
        }

        self.class_index.insert(name.clone(), self.classes.len());
        self.classes.push(ClassSymbol {
            name,
            parent,
            fields,
            methods,
            size: offset,
            type_id,
        });
        Ok(())
    }

    fn lower_class_methods(&mut self, decl: &ClassDecl) -> Result<()> {
        let class_name = decl.name.name.clone();
        for method in &decl.methods {
            let mangled = format!("{}_{}", class_name, method.name);
            let mut params: Vec<(String, DataType)> = vec![("this".to_string(), DataType::Int)];
            for p in &method.params {
                params.push((p.name.name.clone(), self.resolve(&p.ty)));
            }
            self.lower_function(&mangled, params, &method.body, Some(class_name.as_str()))?;
        }
        Ok(())
    }

    fn check_conformance(&self, decl: &ClassDecl) -> Result<()> {
        if decl.implements.is_empty() {
            return Ok(());
        }
        let class = self
            .class(&decl.name.name)
            .ok_or_else(|| anyhow!("undefined class: {}", decl.name.name))?;
        for iface_name in &decl.implements {
            let iface = self
                .interfaces
                .iter()
                .find(|i| i.name == iface_name.name)
                .ok_or_else(|| anyhow!("undefined interface: {}", iface_name.name))?;
            for method in &iface.methods {
                if class.method(&method.name).is_none() {
                    bail!(
                        "class {} does not implement method {} from interface {}",
                        class.name,
                        method.name,
                        iface.name
                    );
                }
            }
        }
        Ok(())
    }

    /// Lowers one function body under the shadow-stack contract: snapshot
    /// `shadow_stack_ptr` into a dedicated local, push every parameter,
    /// compile the body, restore the snapshot, and push the implicit 0 so
    /// every function has the uniform `i32` result.
    fn lower_function(
        &mut self,
        name: &str,
        params: Vec<(String, DataType)>,
        body: &BlockStmt,
        class: Option<&str>,
    ) -> Result<()> {
        let mut scope = FunctionScope::new(name);
        scope.param_count = params.len();
        scope.param_types = params.iter().map(|(_, ty)| *ty).collect();

        let snapshot = scope.alloc_local();
        scope.snapshot_local = snapshot;
        scope.emit("global.get $shadow_stack_ptr");
        scope.emit(format!("local.set {snapshot} ;; save shadow stack frame"));

        for (i, (pname, ty)) in params.into_iter().enumerate() {
            let slot = scope.alloc_shadow_slot();
            scope.symbols.insert(
                pname,
                Symbol {
                    index: i,
                    ty,
                    is_param: true,
                    shadow_slot: slot,
                },
            );
            scope.emit("global.get $shadow_stack_ptr");
            scope.emit(format!("local.get {i}"));
            scope.emit("i32.store");
            scope.emit("global.get $shadow_stack_ptr");
            scope.emit("i32.const 4");
            scope.emit("i32.add");
            scope.emit("global.set $shadow_stack_ptr");
        }

        self.compile_block(&mut scope, class, body)?;

        scope.emit(format!("local.get {snapshot}"));
        scope.emit("global.set $shadow_stack_ptr");
        scope.emit("i32.const 0 ;; implicit result");

        self.functions.push(scope);
        Ok(())
    }

    // ---- Module assembly ----

    /// Emits the final `(module ...)` text.
    pub fn generate_wat(&self) -> String {
        let mut out = String::new();
        out.push_str("(module\n");

        match self.target {
            Target::Wasi => {
                for line in WASI_IMPORTS {
                    out.push_str(line);
                    out.push('\n');
                }
            }
            Target::Browser => {
                for import in &self.imports {
                    out.push_str(import);
                    out.push('\n');
                }
                for line in HOST_IMPORTS {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }

        out.push_str("  (import \"env\" \"memory\" (memory 1 1000 shared))\n");
        out.push_str("  (export \"memory\" (memory 0))\n");
        match self.target {
            Target::Wasi => {
                out.push_str("  (export \"_initialize\" (func $_initialize))\n");
                out.push_str("  (export \"_set_stack_pointer\" (func $_set_stack_pointer))\n");
            }
            Target::Browser => {
                out.push_str("  (export \"gc\" (func $gc_collect))\n");
                // Seed the heap bump pointer; a browser module is
                // instantiated once so an active segment is safe here.
                out.push_str(&format!(
                    "  (data (i32.const {}) \"\\00\\28\\00\\00\")\n",
                    HEAP_PTR_CELL
                ));
            }
        }

        for (s, offset) in &self.string_pool {
            out.push_str(&format!(
                "  (data (i32.const {}) \"{}\\00\")\n",
                offset,
                escape_wat_string(s)
            ));
        }

        out.push_str(runtime::RUNTIME_CORE);
        match self.target {
            Target::Browser => out.push_str(runtime::GC_COLLECT_SWEEPING),
            Target::Wasi => out.push_str(runtime::GC_COLLECT_NOOP),
        }
        if self.target == Target::Wasi {
            out.push_str(runtime::RUNTIME_WASI);
        }

        self.emit_gc_trace(&mut out);

        for func in &self.functions {
            let mut params = String::new();
            for _ in 0..func.param_count {
                params.push_str(" (param i32)");
            }
            out.push_str(&format!(
                "  (func ${0} (export \"{0}\"){1} (result i32)\n",
                func.name, params
            ));
            for _ in 0..func.next_local {
                out.push_str("    (local i32)\n");
            }
            for instruction in &func.instructions {
                out.push_str("    ");
                out.push_str(instruction);
                out.push('\n');
            }
            out.push_str("  )\n");
        }

        out.push_str(")\n");
        out
    }

    /// Generates the per-module `gc_trace` dispatcher: fixed cases for the
    /// builtin container ids, then one case per user class following every
    /// non-leaf field.
    fn emit_gc_trace(&self, out: &mut String) {
        out.push_str("(func $gc_trace (param $ptr i32) (param $type_id i32)\n");
        out.push_str("  (local $i i32)\n");
        out.push_str("  (local $cnt i32)\n");

        // TypeID 1: Array header, trace the backing buffer
        out.push_str("  local.get $type_id\n");
        out.push_str("  i32.const 1\n");
        out.push_str("  i32.eq\n");
        out.push_str("  if\n");
        out.push_str("    local.get $ptr\n");
        out.push_str("    i32.const 8\n");
        out.push_str("    i32.add\n");
        out.push_str("    i32.load\n");
        out.push_str("    call $gc_mark\n");
        out.push_str("    return\n");
        out.push_str("  end\n");

        // TypeID 20: array buffer, walk size/4 slots
        self.emit_trace_buffer_walk(out, 20);
        // TypeID 2: Map header, trace the bucket table
        out.push_str("  local.get $type_id\n");
        out.push_str("  i32.const 2\n");
        out.push_str("  i32.eq\n");
        out.push_str("  if\n");
        out.push_str("    local.get $ptr\n");
        out.push_str("    i32.const 8\n");
        out.push_str("    i32.add\n");
        out.push_str("    i32.load\n");
        out.push_str("    call $gc_mark\n");
        out.push_str("    return\n");
        out.push_str("  end\n");
        // TypeID 21: bucket table, walk size/4 slots
        self.emit_trace_buffer_walk(out, 21);

        // TypeID 22: map entry, mark key, value and next
        out.push_str("  local.get $type_id\n");
        out.push_str("  i32.const 22\n");
        out.push_str("  i32.eq\n");
        out.push_str("  if\n");
        for offset in [0, 4, 8] {
            out.push_str("    local.get $ptr\n");
            if offset != 0 {
                out.push_str(&format!("    i32.const {offset}\n"));
                out.push_str("    i32.add\n");
            }
            out.push_str("    i32.load\n");
            out.push_str("    call $gc_mark\n");
        }
        out.push_str("    return\n");
        out.push_str("  end\n");

        for class in &self.classes {
            out.push_str(&format!(
                "  ;; Class {} (TypeID {})\n",
                class.name, class.type_id
            ));
            out.push_str("  local.get $type_id\n");
            out.push_str(&format!("  i32.const {}\n", class.type_id));
            out.push_str("  i32.eq\n");
            out.push_str("  if\n");
            for field in &class.fields {
                if field.ty.is_leaf() {
                    continue;
                }
                out.push_str(&format!(
                    "    ;; Field {} (offset {})\n",
                    field.name, field.offset
                ));
                out.push_str("    local.get $ptr\n");
                out.push_str(&format!("    i32.const {}\n", field.offset));
                out.push_str("    i32.add\n");
                out.push_str("    i32.load\n");
                out.push_str("    call $gc_mark\n");
            }
            out.push_str("    return\n");
            out.push_str("  end\n");
        }

        out.push_str(")\n");
    }

    /// A trace case that walks a raw pointer buffer whose element count is
    /// the header's payload size divided by 4.
    fn emit_trace_buffer_walk(&self, out: &mut String, type_id: i32) {
        out.push_str("  local.get $type_id\n");
        out.push_str(&format!("  i32.const {type_id}\n"));
        out.push_str("  i32.eq\n");
        out.push_str("  if\n");
        out.push_str("    local.get $ptr\n");
        out.push_str("    i32.const 12\n");
        out.push_str("    i32.sub\n");
        out.push_str("    i32.load\n");
        out.push_str("    i32.const 4\n");
        out.push_str("    i32.div_u\n");
        out.push_str("    local.set $cnt\n");
        out.push_str("    i32.const 0\n");
        out.push_str("    local.set $i\n");
        out.push_str("    (block $done_trace\n");
        out.push_str("      (loop $trace\n");
        out.push_str("        local.get $i\n");
        out.push_str("        local.get $cnt\n");
        out.push_str("        i32.ge_u\n");
        out.push_str("        br_if $done_trace\n");
        out.push_str("        local.get $ptr\n");
        out.push_str("        local.get $i\n");
        out.push_str("        i32.const 4\n");
        out.push_str("        i32.mul\n");
        out.push_str("        i32.add\n");
        out.push_str("        i32.load\n");
        out.push_str("        call $gc_mark\n");
        out.push_str("        local.get $i\n");
        out.push_str("        i32.const 1\n");
        out.push_str("        i32.add\n");
        out.push_str("        local.set $i\n");
        out.push_str("        br $trace\n");
        out.push_str("      )\n");
        out.push_str("    )\n");
        out.push_str("    return\n");
        out.push_str("  end\n");
    }
}

/// Walks statements with `export` wrappers peeled off; the keyword has no
/// compile-time effect.
fn unwrapped(statements: &[Stmt]) -> impl Iterator<Item = &Stmt> {
    fn peel(stmt: &Stmt) -> &Stmt {
        match stmt {
            Stmt::Export(e) => peel(&e.inner),
            other => other,
        }
    }
    statements.iter().map(peel)
}

/// Escapes a string for a WAT data segment: printable ASCII passes
/// through, quotes and backslashes are escaped, everything else becomes a
/// two-digit hex escape.
pub(crate) fn escape_wat_string(s: &str) -> String {
    let mut out = String::new();
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:02x}", b)),
        }
    }
    out
}

/// Escapes a string for use inside a `;;` comment (no raw newlines).
pub(crate) fn escape_comment(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out
}

const WASI_IMPORTS: &[&str] = &[
    "  (import \"wasi_snapshot_preview1\" \"fd_write\" (func $fd_write (param i32 i32 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"path_open\" (func $path_open (param i32 i32 i32 i32 i32 i64 i64 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"fd_close\" (func $fd_close (param i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"fd_read\" (func $fd_read (param i32 i32 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"fd_filestat_get\" (func $fd_filestat_get (param i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"args_sizes_get\" (func $args_sizes_get (param i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"args_get\" (func $args_get (param i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"environ_sizes_get\" (func $environ_sizes_get (param i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"environ_get\" (func $environ_get (param i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"path_unlink_file\" (func $path_unlink_file (param i32 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"path_create_directory\" (func $path_create_directory (param i32 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"path_remove_directory\" (func $path_remove_directory (param i32 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"path_filestat_get\" (func $path_filestat_get (param i32 i32 i32 i32 i32) (result i32)))",
    "  (import \"wasi_snapshot_preview1\" \"proc_exit\" (func $proc_exit (param i32)))",
    "  (import \"env\" \"thread_spawn\" (func $thread_spawn (param i32 i32)))",
];

const HOST_IMPORTS: &[&str] = &[
    "  (import \"env\" \"host_get_global\" (func $host_get_global (param i32) (result i32)))",
    "  (import \"env\" \"host_get\" (func $host_get (param i32) (param i32) (result i32)))",
    "  (import \"env\" \"host_set\" (func $host_set (param i32) (param i32) (param i32)))",
    "  (import \"env\" \"host_call\" (func $host_call (param i32) (param i32) (param i32) (param i32) (result i32)))",
    "  (import \"env\" \"host_from_int\" (func $host_from_int (param i32) (result i32)))",
    "  (import \"env\" \"host_from_string\" (func $host_from_string (param i32) (result i32)))",
    "  (import \"env\" \"host_to_int\" (func $host_to_int (param i32) (result i32)))",
];
