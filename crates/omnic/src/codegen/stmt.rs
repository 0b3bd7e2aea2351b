//! Statement lowering
//!
//! Statements manage the shadow-stack bookkeeping: `let` roots its local
//! right after the value is computed, `return` restores the frame's
//! shadow window on the way out, and `spawn` packages its arguments into
//! a managed (rooted) array before handing off to the host.

use anyhow::{Result, bail};

use omni_ast::{BlockStmt, Expr, SpawnStmt, Stmt};

use super::{Compiler, Target};
use crate::symbols::{FunctionScope, Symbol};
use crate::types::DataType;

impl Compiler {
    pub(crate) fn compile_block(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        block: &BlockStmt,
    ) -> Result<()> {
        for stmt in &block.statements {
            self.compile_stmt(scope, class, stmt)?;
        }
        Ok(())
    }

    pub(crate) fn compile_stmt(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        stmt: &Stmt,
    ) -> Result<()> {
        match stmt {
            Stmt::Let(l) => {
                let value_ty = self.compile_expr(scope, class, &l.value)?;
                let ty = if value_ty == DataType::Unknown {
                    DataType::Int
                } else {
                    value_ty
                };
                let index = scope.alloc_local();
                let slot = scope.alloc_shadow_slot();
                scope.symbols.insert(
                    l.name.name.clone(),
                    Symbol {
                        index,
                        ty,
                        is_param: false,
                        shadow_slot: slot,
                    },
                );
                scope.emit(format!("local.set {} ;; {} ({})", index, l.name.name, ty));
                self.emit_shadow_push(scope, index);
                Ok(())
            }
            Stmt::Return(r) => {
                match &r.value {
                    Some(value) => {
                        self.compile_expr(scope, class, value)?;
                    }
                    None => scope.emit("i32.const 0"),
                }
                // Pop this frame's shadow window before leaving
                scope.emit(format!("local.get {}", scope.snapshot_local));
                scope.emit("global.set $shadow_stack_ptr");
                scope.emit("return");
                Ok(())
            }
            Stmt::Expr(es) => {
                if matches!(es.expr, Expr::Function(_)) {
                    // Top-level function literals are lowered by the
                    // program walker, not as expressions.
                    bail!("nested function definitions are not supported");
                }
                let ty = self.compile_expr(scope, class, &es.expr)?;
                if ty != DataType::Void {
                    scope.emit("drop");
                }
                Ok(())
            }
            Stmt::Block(b) => self.compile_block(scope, class, b),
            Stmt::While(w) => {
                scope.emit("block $break");
                scope.emit("loop $continue");
                self.compile_expr(scope, class, &w.condition)?;
                scope.emit("i32.eqz");
                scope.emit("br_if $break");
                self.compile_block(scope, class, &w.body)?;
                scope.emit("br $continue");
                scope.emit("end");
                scope.emit("end");
                Ok(())
            }
            Stmt::For(f) => {
                if let Some(init) = &f.init {
                    self.compile_stmt(scope, class, init)?;
                }
                scope.emit("block $break");
                scope.emit("loop $top");
                if let Some(condition) = &f.condition {
                    self.compile_expr(scope, class, condition)?;
                    scope.emit("i32.eqz");
                    scope.emit("br_if $break");
                }
                self.compile_block(scope, class, &f.body)?;
                if let Some(update) = &f.update {
                    self.compile_stmt(scope, class, update)?;
                }
                scope.emit("br $top");
                scope.emit("end");
                scope.emit("end");
                Ok(())
            }
            Stmt::Spawn(s) => self.compile_spawn(scope, class, s),
            // Declarations are handled by the walker's passes
            Stmt::Class(_)
            | Stmt::Interface(_)
            | Stmt::Enum(_)
            | Stmt::TypeAlias(_)
            | Stmt::Declare(_)
            | Stmt::Import(_) => Ok(()),
            Stmt::Export(e) => self.compile_stmt(scope, class, &e.inner),
        }
    }

    /// `spawn f(args)`: package the arguments into a managed array,
    /// resolve `f` to an interned name, and hand both to the host's
    /// `thread_spawn`. Fire-and-forget.
    fn compile_spawn(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        s: &SpawnStmt,
    ) -> Result<()> {
        if self.target() != Target::Wasi {
            bail!("spawn is only supported in WASI target");
        }
        let Expr::Ident(func) = &*s.call.callee else {
            bail!("spawn expects a direct function call");
        };

        scope.emit(format!("i32.const {}", s.call.arguments.len()));
        scope.emit("call $array_new");
        let args_array = self.alloc_rooted_scratch(scope);
        for arg in &s.call.arguments {
            scope.emit(format!("local.get {args_array}"));
            self.compile_expr(scope, class, arg)?;
            scope.emit("call $array_push");
        }

        let offset = self.intern(&func.name);
        scope.emit(format!("i32.const {} ;; \"{}\"", offset, func.name));
        scope.emit(format!("local.get {args_array}"));
        scope.emit("call $thread_spawn");
        Ok(())
    }
}
