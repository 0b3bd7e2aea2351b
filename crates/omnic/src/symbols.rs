//! Symbol tables and per-function compilation state.
//!
//! Declaration-order vectors back every table that the emitter searches
//! linearly (classes, enums, interfaces), so "first match wins" is
//! deterministic across runs.

use crate::types::DataType;
use std::collections::HashMap;

/// One field of a class instance.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    /// Byte offset from the instance pointer.
    pub offset: i32,
    pub ty: DataType,
}

/// One method of a class; `mangled` is the emitted WAT function name
/// (`ClassName_methodName`). Inherited entries keep the parent's mangling.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub name: String,
    pub mangled: String,
}

/// A fully laid-out class.
#[derive(Debug, Clone)]
pub struct ClassSymbol {
    pub name: String,
    pub parent: Option<String>,
    /// Fields in layout order: inherited first, then own declarations.
    pub fields: Vec<FieldInfo>,
    /// Methods in resolution order; overriding replaces in place.
    pub methods: Vec<MethodInfo>,
    /// Instance size in bytes (4 per field).
    pub size: i32,
    /// Allocation tag for the collector; user classes start at 10.
    pub type_id: i32,
}

impl ClassSymbol {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// An interface: method names with their arities.
#[derive(Debug, Clone)]
pub struct InterfaceSymbol {
    pub name: String,
    pub methods: Vec<InterfaceMethod>,
}

#[derive(Debug, Clone)]
pub struct InterfaceMethod {
    pub name: String,
    pub arity: usize,
    pub return_type: String,
}

/// An enum: members with their resolved integer values, in source order.
#[derive(Debug, Clone)]
pub struct EnumSymbol {
    pub name: String,
    pub members: Vec<(String, i32)>,
}

impl EnumSymbol {
    pub fn member(&self, name: &str) -> Option<i32> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// A `declare function` import.
#[derive(Debug, Clone)]
pub struct ExternSymbol {
    pub name: String,
    pub param_count: usize,
    pub return_type: String,
}

/// A local variable or parameter inside a function scope.
#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    /// Absolute local index (parameters come first).
    pub index: usize,
    pub ty: DataType,
    pub is_param: bool,
    /// Slot in this function's shadow-stack window.
    pub shadow_slot: usize,
}

/// Per-function compilation state: the instruction buffer, the local
/// symbol table, and the counters the module assembler needs to declare
/// locals and size the shadow-stack frame.
#[derive(Debug)]
pub struct FunctionScope {
    pub name: String,
    pub instructions: Vec<String>,
    pub symbols: HashMap<String, Symbol>,
    /// Locals allocated beyond the parameters (includes the snapshot
    /// local and scratch temporaries).
    pub next_local: usize,
    pub param_count: usize,
    pub param_types: Vec<DataType>,
    /// Number of shadow-stack slots this frame pushes.
    pub shadow_size: usize,
    /// Local holding the pre-entry `shadow_stack_ptr` snapshot; doubles
    /// as the base address of this frame's shadow window.
    pub snapshot_local: usize,
}

impl FunctionScope {
    pub fn new(name: impl Into<String>) -> Self {
        FunctionScope {
            name: name.into(),
            instructions: Vec::new(),
            symbols: HashMap::new(),
            next_local: 0,
            param_count: 0,
            param_types: Vec::new(),
            shadow_size: 0,
            snapshot_local: 0,
        }
    }

    pub fn emit(&mut self, instruction: impl Into<String>) {
        self.instructions.push(instruction.into());
    }

    /// Allocates a fresh local beyond the parameters and returns its
    /// absolute index.
    pub fn alloc_local(&mut self) -> usize {
        let index = self.param_count + self.next_local;
        self.next_local += 1;
        index
    }

    /// Claims the next shadow-stack slot.
    pub fn alloc_shadow_slot(&mut self) -> usize {
        let slot = self.shadow_size;
        self.shadow_size += 1;
        slot
    }
}
