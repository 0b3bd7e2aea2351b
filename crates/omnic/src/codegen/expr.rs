//! Expression lowering
//!
//! Each routine leaves exactly one value on the WAT operand stack and
//! returns the static type of that value. Scratch locals that can hold
//! pointers always get a shadow-stack slot, so a collection triggered by
//! an allocation mid-expression never observes an unrooted value.

use anyhow::{Result, anyhow, bail};

use omni_ast::{
    ArrayLit, AssignExpr, BinaryOp, CallExpr, Expr, Ident, IfExpr, InfixExpr, MapLit, MemberExpr,
    NewExpr, PrefixOp,
};

use super::{Compiler, Target, escape_comment};
use crate::symbols::{FunctionScope, Symbol};
use crate::types::DataType;

impl Compiler {
    pub(crate) fn compile_expr(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        expr: &Expr,
    ) -> Result<DataType> {
        match expr {
            Expr::Int(lit) => {
                scope.emit(format!("i32.const {}", lit.value));
                Ok(DataType::Int)
            }
            Expr::Bool(lit) => {
                scope.emit(if lit.value {
                    "i32.const 1"
                } else {
                    "i32.const 0"
                });
                Ok(DataType::Bool)
            }
            Expr::Str(lit) => {
                let offset = self.intern(&lit.value);
                scope.emit(format!(
                    "i32.const {} ;; \"{}\"",
                    offset,
                    escape_comment(&lit.value)
                ));
                Ok(DataType::String)
            }
            Expr::Ident(id) => self.compile_identifier(scope, id),
            Expr::This(_) => {
                scope.emit("local.get 0 ;; this");
                Ok(DataType::Int)
            }
            Expr::Super(_) => {
                // Bare `super` only makes sense as a call receiver; the
                // value is the instance itself.
                scope.emit("local.get 0 ;; this (super)");
                Ok(DataType::Int)
            }
            Expr::Prefix(p) => match p.op {
                PrefixOp::Not => {
                    self.compile_expr(scope, class, &p.right)?;
                    scope.emit("i32.eqz");
                    Ok(DataType::Bool)
                }
                PrefixOp::Neg => {
                    let ty = self.compile_expr(scope, class, &p.right)?;
                    if ty != DataType::Int {
                        bail!("operator - not defined for type {}", ty);
                    }
                    scope.emit("i32.const -1");
                    scope.emit("i32.mul");
                    Ok(DataType::Int)
                }
            },
            Expr::Infix(e) => self.compile_infix(scope, class, e),
            Expr::Array(e) => self.compile_array_literal(scope, class, e),
            Expr::Map(e) => self.compile_map_literal(scope, class, e),
            Expr::Index(e) => {
                let target_ty = self.compile_expr(scope, class, &e.left)?;
                let index_ty = self.compile_expr(scope, class, &e.index)?;
                if target_ty == DataType::Array {
                    scope.emit("call $array_get");
                } else if target_ty == DataType::Map || index_ty == DataType::String {
                    // A string index duck-types the receiver as a map
                    scope.emit("call $map_get");
                } else {
                    scope.emit("call $array_get");
                }
                Ok(DataType::Int)
            }
            Expr::Member(e) => self.compile_member(scope, class, e),
            Expr::Assign(e) => self.compile_assign(scope, class, e),
            Expr::New(e) => self.compile_new(scope, class, e),
            Expr::Call(e) => self.compile_call(scope, class, e),
            Expr::If(e) => self.compile_if(scope, class, e),
            Expr::Function(_) => bail!("closures are not supported"),
        }
    }

    fn compile_identifier(&mut self, scope: &mut FunctionScope, id: &Ident) -> Result<DataType> {
        if let Some(sym) = scope.symbols.get(&id.name).copied() {
            scope.emit(format!("local.get {} ;; {} ({})", sym.index, id.name, sym.ty));
            return Ok(sym.ty);
        }
        if self.class(&id.name).is_some() {
            bail!("class usage as value not supported: {}", id.name);
        }
        match self.target() {
            Target::Browser => {
                // Unknown names fall through to the host's global object
                let offset = self.intern(&id.name);
                scope.emit(format!("i32.const {} ;; \"{}\"", offset, id.name));
                scope.emit("call $host_get_global");
                Ok(DataType::Host)
            }
            Target::Wasi => bail!("undefined variable: {}", id.name),
        }
    }

    fn compile_infix(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        e: &InfixExpr,
    ) -> Result<DataType> {
        let lt = self.compile_expr(scope, class, &e.left)?;
        let rt = self.compile_expr(scope, class, &e.right)?;
        match e.op {
            BinaryOp::Add => match (lt, rt) {
                (DataType::Int, DataType::Int) => {
                    scope.emit("i32.add");
                    Ok(DataType::Int)
                }
                (DataType::String, DataType::String) => {
                    scope.emit("call $str_concat");
                    Ok(DataType::String)
                }
                (DataType::String, DataType::Int) => {
                    scope.emit("call $itos");
                    scope.emit("call $str_concat");
                    Ok(DataType::String)
                }
                (DataType::Int, DataType::String) => {
                    // Stack holds [int, string]; park the string so the
                    // int can be stringified, then concat in order.
                    let scratch = self.alloc_rooted_scratch(scope);
                    scope.emit("call $itos");
                    scope.emit(format!("local.get {scratch}"));
                    scope.emit("call $str_concat");
                    Ok(DataType::String)
                }
                _ => bail!("operator + not defined for types {} and {}", lt, rt),
            },
            BinaryOp::Sub => {
                self.require_ints(lt, rt, "-")?;
                scope.emit("i32.sub");
                Ok(DataType::Int)
            }
            BinaryOp::Mul => {
                self.require_ints(lt, rt, "*")?;
                scope.emit("i32.mul");
                Ok(DataType::Int)
            }
            BinaryOp::Div => {
                self.require_ints(lt, rt, "/")?;
                scope.emit("i32.div_s");
                Ok(DataType::Int)
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                let pointer_pair = (lt == DataType::Host && rt == DataType::Int)
                    || (lt == DataType::Int && rt == DataType::Host);
                if lt != rt && !pointer_pair {
                    bail!("operator {} not defined for types {} and {}", e.op, lt, rt);
                }
                scope.emit(if e.op == BinaryOp::Eq {
                    "i32.eq"
                } else {
                    "i32.ne"
                });
                Ok(DataType::Bool)
            }
            BinaryOp::Lt => {
                self.require_ints(lt, rt, "<")?;
                scope.emit("i32.lt_s");
                Ok(DataType::Bool)
            }
            BinaryOp::Gt => {
                self.require_ints(lt, rt, ">")?;
                scope.emit("i32.gt_s");
                Ok(DataType::Bool)
            }
        }
    }

    fn require_ints(&self, lt: DataType, rt: DataType, op: &str) -> Result<()> {
        if lt != DataType::Int || rt != DataType::Int {
            bail!("operator {} not defined for types {} and {}", op, lt, rt);
        }
        Ok(())
    }

    fn compile_array_literal(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        lit: &ArrayLit,
    ) -> Result<DataType> {
        scope.emit(format!("i32.const {}", lit.elements.len()));
        scope.emit("call $array_new");
        // Root the container before compiling elements so an allocating
        // element expression cannot orphan it.
        let arr = self.alloc_rooted_scratch(scope);
        for element in &lit.elements {
            scope.emit(format!("local.get {arr}"));
            self.compile_expr(scope, class, element)?;
            scope.emit("call $array_push");
        }
        scope.emit(format!("local.get {arr}"));
        Ok(DataType::Array)
    }

    fn compile_map_literal(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        lit: &MapLit,
    ) -> Result<DataType> {
        scope.emit("call $map_new");
        let map = self.alloc_rooted_scratch(scope);
        for (key, value) in &lit.pairs {
            scope.emit(format!("local.get {map}"));
            let key_ty = self.compile_expr(scope, class, key)?;
            if key_ty != DataType::String {
                bail!("map keys must be strings");
            }
            self.compile_expr(scope, class, value)?;
            scope.emit("call $map_set");
        }
        scope.emit(format!("local.get {map}"));
        Ok(DataType::Map)
    }

    fn compile_member(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        e: &MemberExpr,
    ) -> Result<DataType> {
        let prop = e.property.name.clone();

        if let Expr::Ident(obj) = &*e.object
            && !scope.symbols.contains_key(&obj.name)
        {
            // Enum member dereference
            if let Some(en) = self.enums.iter().find(|en| en.name == obj.name) {
                return match en.member(&prop) {
                    Some(value) => {
                        scope.emit(format!("i32.const {} ;; {}.{}", value, obj.name, prop));
                        Ok(DataType::Int)
                    }
                    None => bail!("unknown property: {}.{}", obj.name, prop),
                };
            }
            if self.target() == Target::Wasi && obj.name == "process" && prop == "env" {
                scope.emit("call $process_env");
                return Ok(DataType::Map);
            }
        }

        let object_ty = self.compile_expr(scope, class, &e.object)?;

        if prop == "length" && object_ty == DataType::String {
            scope.emit("call $strlen");
            return Ok(DataType::Int);
        }
        if prop == "length" {
            scope.emit("call $array_length");
            return Ok(DataType::Int);
        }

        if object_ty == DataType::Host {
            let offset = self.intern(&prop);
            scope.emit(format!("i32.const {} ;; \"{}\"", offset, prop));
            scope.emit("call $host_get");
            return Ok(DataType::Host);
        }

        // Field lookup across every class, declaration order, first match
        for cls in &self.classes {
            if let Some(field) = cls.field(&prop) {
                let (offset, field_ty) = (field.offset, field.ty);
                scope.emit(format!("i32.const {offset}"));
                scope.emit("i32.add");
                scope.emit("i32.load");
                return Ok(field_ty);
            }
        }
        bail!("unknown property: {}", prop)
    }

    fn compile_assign(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        e: &AssignExpr,
    ) -> Result<DataType> {
        match &*e.target {
            Expr::Member(member) => {
                let object_ty = self.compile_expr(scope, class, &member.object)?;
                let prop = member.property.name.clone();

                if object_ty == DataType::Host {
                    let offset = self.intern(&prop);
                    scope.emit(format!("i32.const {} ;; \"{}\"", offset, prop));
                    let value_ty = self.compile_expr(scope, class, &e.value)?;
                    self.convert_to_host(scope, value_ty);
                    scope.emit("call $host_set");
                    scope.emit("i32.const 0");
                    return Ok(DataType::Int);
                }

                let mut field_offset = None;
                for cls in &self.classes {
                    if let Some(field) = cls.field(&prop) {
                        field_offset = Some(field.offset);
                        break;
                    }
                }
                let offset = field_offset
                    .ok_or_else(|| anyhow!("unknown property in assignment: {}", prop))?;
                scope.emit(format!("i32.const {offset}"));
                scope.emit("i32.add");
                self.compile_expr(scope, class, &e.value)?;
                scope.emit("i32.store");
                scope.emit("i32.const 0");
                Ok(DataType::Int)
            }
            Expr::Index(index) => {
                let target_ty = self.compile_expr(scope, class, &index.left)?;
                let index_ty = self.compile_expr(scope, class, &index.index)?;
                self.compile_expr(scope, class, &e.value)?;
                if target_ty == DataType::Array {
                    scope.emit("call $array_set");
                } else if target_ty == DataType::Map || index_ty == DataType::String {
                    scope.emit("call $map_set");
                } else {
                    scope.emit("call $array_set");
                }
                scope.emit("i32.const 0");
                Ok(DataType::Int)
            }
            Expr::Ident(id) => {
                let value_ty = self.compile_expr(scope, class, &e.value)?;
                let sym = *scope
                    .symbols
                    .get(&id.name)
                    .ok_or_else(|| anyhow!("undefined variable: {}", id.name))?;
                scope.emit(format!("local.set {}", sym.index));
                scope.emit(format!("local.get {}", sym.index));
                self.emit_shadow_write_through(scope, sym);
                Ok(value_ty)
            }
            _ => bail!("invalid assignment target"),
        }
    }

    fn compile_new(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        e: &NewExpr,
    ) -> Result<DataType> {
        let cls = self
            .class(&e.class.name)
            .cloned()
            .ok_or_else(|| anyhow!("undefined class: {}", e.class.name))?;

        scope.emit(format!("i32.const {} ;; sizeof {}", cls.size, cls.name));
        scope.emit(format!("i32.const {}", cls.type_id));
        scope.emit("call $malloc");
        let instance = self.alloc_rooted_scratch(scope);

        if let Some(init) = cls.method("init") {
            scope.emit(format!("local.get {instance}"));
            for arg in &e.arguments {
                self.compile_expr(scope, class, arg)?;
            }
            scope.emit(format!("call ${}", init.mangled));
            scope.emit("drop ;; init result unused");
        } else if !e.arguments.is_empty() {
            bail!(
                "arguments provided for class {} but no 'init' method found",
                cls.name
            );
        }

        scope.emit(format!("local.get {instance}"));
        Ok(DataType::Int)
    }

    fn compile_if(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        e: &IfExpr,
    ) -> Result<DataType> {
        self.compile_expr(scope, class, &e.condition)?;
        scope.emit("if (result i32)");
        self.compile_block(scope, class, &e.consequence)?;
        // Branch bodies are statements; push a dummy so the node always
        // leaves an i32.
        scope.emit("i32.const 0");
        scope.emit("else");
        if let Some(alternative) = &e.alternative {
            self.compile_block(scope, class, alternative)?;
        }
        scope.emit("i32.const 0");
        scope.emit("end");
        Ok(DataType::Int)
    }

    // ---- Calls ----

    pub(crate) fn compile_call(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        call: &CallExpr,
    ) -> Result<DataType> {
        match &*call.callee {
            Expr::Member(member) => {
                self.compile_method_call(scope, class, member, &call.arguments)
            }
            Expr::Ident(id) => self.compile_named_call(scope, class, id, &call.arguments),
            _ => bail!("complex function calls not supported yet"),
        }
    }

    fn compile_method_call(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        member: &MemberExpr,
        args: &[Expr],
    ) -> Result<DataType> {
        let prop = member.property.name.clone();

        // super.method(args) dispatches to the parent's mangled function
        if matches!(&*member.object, Expr::Super(_)) {
            let class_name = class.ok_or_else(|| anyhow!("super used outside class"))?;
            let cls = self
                .class(class_name)
                .cloned()
                .ok_or_else(|| anyhow!("undefined class: {}", class_name))?;
            let parent_name = cls
                .parent
                .ok_or_else(|| anyhow!("super in class with no parent"))?;
            let parent = self
                .class(&parent_name)
                .cloned()
                .ok_or_else(|| anyhow!("undefined parent class: {}", parent_name))?;
            let method = parent.method(&prop).ok_or_else(|| {
                anyhow!("method {} not found in parent class {}", prop, parent_name)
            })?;
            scope.emit("local.get 0 ;; this (super)");
            for arg in args {
                self.compile_expr(scope, class, arg)?;
            }
            scope.emit(format!("call ${}", method.mangled));
            return Ok(DataType::Int);
        }

        // Builtin recognisers, keyed by shape
        match prop.as_str() {
            "push" => {
                self.compile_expr(scope, class, &member.object)?;
                if args.len() != 1 {
                    bail!("push expects 1 argument");
                }
                self.compile_expr(scope, class, &args[0])?;
                scope.emit("call $array_push");
                return Ok(DataType::Void);
            }
            "substring" => {
                self.compile_expr(scope, class, &member.object)?;
                if args.len() != 2 {
                    bail!("substring expects 2 arguments (start, end)");
                }
                self.compile_expr(scope, class, &args[0])?;
                self.compile_expr(scope, class, &args[1])?;
                scope.emit("call $string_substring");
                return Ok(DataType::String);
            }
            "charCodeAt" => {
                self.compile_expr(scope, class, &member.object)?;
                if args.len() != 1 {
                    bail!("charCodeAt expects 1 argument (index)");
                }
                self.compile_expr(scope, class, &args[0])?;
                scope.emit("call $string_charCodeAt");
                return Ok(DataType::Int);
            }
            _ => {}
        }

        // Target-gated filesystem/stdlib/path families on a bare receiver
        if let Expr::Ident(obj) = &*member.object
            && !scope.symbols.contains_key(&obj.name)
        {
            if obj.name == "fs" {
                if let Some(result) = self.compile_fs_call(scope, class, &prop, args)? {
                    return Ok(result);
                }
            }
            if self.target() == Target::Wasi {
                if obj.name == "std" && prop == "args" {
                    scope.emit("call $std_args");
                    return Ok(DataType::Array);
                }
                if obj.name == "path" {
                    match prop.as_str() {
                        "basename" | "dirname" | "extname" => {
                            if args.len() != 1 {
                                bail!("path.{} expects 1 argument", prop);
                            }
                            self.compile_expr(scope, class, &args[0])?;
                            scope.emit(format!("call $path_{}", prop));
                            return Ok(DataType::String);
                        }
                        "join" => {
                            if args.is_empty() {
                                bail!("path.join expects at least 1 argument");
                            }
                            // Left fold over the two-argument primitive
                            self.compile_expr(scope, class, &args[0])?;
                            for arg in &args[1..] {
                                self.compile_expr(scope, class, arg)?;
                                scope.emit("call $path_join2");
                            }
                            return Ok(DataType::String);
                        }
                        _ => {}
                    }
                }
                if obj.name == "process" && prop == "exit" {
                    if args.len() != 1 {
                        bail!("process.exit expects 1 argument");
                    }
                    self.compile_expr(scope, class, &args[0])?;
                    scope.emit("call $proc_exit");
                    // proc_exit never returns; satisfy validation
                    scope.emit("unreachable");
                    return Ok(DataType::Void);
                }
            }
        }

        let object_ty = self.compile_expr(scope, class, &member.object)?;

        if object_ty == DataType::Host {
            // host_call(handle, method_name, args_ptr, args_len)
            let handle = self.alloc_rooted_scratch(scope);
            let args_ptr = self.emit_host_args_buffer(scope, class, args)?;
            scope.emit(format!("local.get {handle}"));
            let offset = self.intern(&prop);
            scope.emit(format!("i32.const {} ;; \"{}\"", offset, prop));
            scope.emit(format!("local.get {args_ptr}"));
            scope.emit(format!("i32.const {}", args.len()));
            scope.emit("call $host_call");
            return Ok(DataType::Host);
        }

        // Class-method call; the receiver's value is `this`. When the
        // receiver's class is statically known (`new C(...)` or `this`),
        // dispatch is exact; otherwise a linear search across every
        // class resolves the name, first match wins.
        let receiver_class = match &*member.object {
            Expr::New(n) => Some(n.class.name.clone()),
            Expr::This(_) => class.map(str::to_string),
            _ => None,
        };
        let exact = receiver_class
            .and_then(|name| self.class(&name))
            .and_then(|cls| cls.method(&prop))
            .map(|m| m.mangled.clone());
        let mangled = match exact {
            Some(mangled) => mangled,
            None => self
                .classes
                .iter()
                .find_map(|cls| cls.method(&prop).map(|m| m.mangled.clone()))
                .ok_or_else(|| anyhow!("unknown method: {}", prop))?,
        };
        for arg in args {
            self.compile_expr(scope, class, arg)?;
        }
        scope.emit(format!("call ${}", mangled));
        Ok(DataType::Int)
    }

    /// The `fs.*` family; every member is wasi-only and errors elsewhere.
    /// Returns `Ok(None)` for property names outside the family.
    fn compile_fs_call(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        prop: &str,
        args: &[Expr],
    ) -> Result<Option<DataType>> {
        let (helper, arity, result) = match prop {
            "writeFile" | "writeFileSync" => ("$fs_writeFile", 2, DataType::Void),
            "readFile" | "readFileSync" => ("$fs_readFile", 1, DataType::String),
            "existsSync" => ("$fs_existsSync", 1, DataType::Bool),
            "unlinkSync" => ("$fs_unlink", 1, DataType::Void),
            "mkdirSync" => ("$fs_mkdir", 1, DataType::Void),
            "rmdirSync" => ("$fs_rmdir", 1, DataType::Void),
            _ => return Ok(None),
        };
        if self.target() != Target::Wasi {
            bail!("fs.{} is only supported in WASI target", prop);
        }
        if args.len() != arity {
            bail!("fs.{} expects {} argument(s)", prop, arity);
        }
        for arg in args {
            self.compile_expr(scope, class, arg)?;
        }
        scope.emit(format!("call {}", helper));
        Ok(Some(result))
    }

    fn compile_named_call(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        id: &Ident,
        args: &[Expr],
    ) -> Result<DataType> {
        // 1. A local: only host handles are callable
        if scope.symbols.contains_key(&id.name) {
            let ty = self.compile_identifier(scope, id)?;
            if ty == DataType::Host {
                let handle = self.alloc_rooted_scratch(scope);
                let args_ptr = self.emit_host_args_buffer(scope, class, args)?;
                scope.emit(format!("local.get {handle}"));
                scope.emit("i32.const 0 ;; call handle as function");
                scope.emit(format!("local.get {args_ptr}"));
                scope.emit(format!("i32.const {}", args.len()));
                scope.emit("call $host_call");
                return Ok(DataType::Host);
            }
            bail!(
                "calling local variable {} of type {} not supported",
                id.name,
                ty
            );
        }

        // 2. An extern from `declare`
        if let Some(ext) = self.externs.get(&id.name).cloned() {
            for arg in args {
                self.compile_expr(scope, class, arg)?;
            }
            scope.emit(format!("call ${}", id.name));
            return Ok(if ext.return_type != "void" && !ext.return_type.is_empty() {
                DataType::Int
            } else {
                DataType::Void
            });
        }

        // 3. A declared top-level function; arity is enforced
        if let Some(expected) = self.declared_fns.get(&id.name).map(|p| p.len()) {
            if args.len() != expected {
                bail!(
                    "function {} expects {} arguments, got {}",
                    id.name,
                    expected,
                    args.len()
                );
            }
            for arg in args {
                self.compile_expr(scope, class, arg)?;
            }
            scope.emit(format!("call ${}", id.name));
            return Ok(DataType::Int);
        }

        // 4. Target fallback
        match self.target() {
            Target::Wasi => match id.name.as_str() {
                "print" => {
                    if args.len() != 1 {
                        bail!("print expects 1 argument");
                    }
                    self.compile_expr(scope, class, &args[0])?;
                    scope.emit("call $wasi_print");
                    Ok(DataType::Void)
                }
                "int_to_string" => {
                    if args.len() != 1 {
                        bail!("int_to_string expects 1 argument");
                    }
                    self.compile_expr(scope, class, &args[0])?;
                    scope.emit("call $itos");
                    Ok(DataType::String)
                }
                _ => bail!("unknown function or global in WASI mode: {}", id.name),
            },
            Target::Browser => {
                // Implicit global host call
                let offset = self.intern(&id.name);
                scope.emit(format!("i32.const {} ;; \"{}\"", offset, id.name));
                scope.emit("call $host_get_global");
                let handle = self.alloc_rooted_scratch(scope);
                let args_ptr = self.emit_host_args_buffer(scope, class, args)?;
                scope.emit(format!("local.get {handle}"));
                scope.emit("i32.const 0 ;; call handle as function");
                scope.emit(format!("local.get {args_ptr}"));
                scope.emit(format!("i32.const {}", args.len()));
                scope.emit("call $host_call");
                Ok(DataType::Host)
            }
        }
    }

    // ---- Shared emission helpers ----

    /// Takes the value on top of the stack into a fresh local that owns a
    /// shadow-stack slot, and roots it immediately. Returns the local
    /// index; the value is no longer on the stack.
    pub(crate) fn alloc_rooted_scratch(&mut self, scope: &mut FunctionScope) -> usize {
        let index = scope.alloc_local();
        scope.alloc_shadow_slot();
        scope.emit(format!("local.set {index}"));
        self.emit_shadow_push(scope, index);
        index
    }

    /// Pushes local `index` onto the shadow stack and bumps the pointer.
    pub(crate) fn emit_shadow_push(&self, scope: &mut FunctionScope, index: usize) {
        scope.emit("global.get $shadow_stack_ptr");
        scope.emit(format!("local.get {index}"));
        scope.emit("i32.store");
        scope.emit("global.get $shadow_stack_ptr");
        scope.emit("i32.const 4");
        scope.emit("i32.add");
        scope.emit("global.set $shadow_stack_ptr");
    }

    /// Rewrites a local's existing shadow slot after a mutation so the
    /// root set always sees the current value.
    fn emit_shadow_write_through(&self, scope: &mut FunctionScope, sym: Symbol) {
        scope.emit(format!(
            "local.get {} ;; shadow frame base",
            scope.snapshot_local
        ));
        scope.emit(format!("i32.const {}", sym.shadow_slot * 4));
        scope.emit("i32.add");
        scope.emit(format!("local.get {}", sym.index));
        scope.emit("i32.store");
    }

    /// Allocates and fills the argument buffer for a host call. Primitive
    /// arguments are converted to handles. Returns the local holding the
    /// buffer pointer (0 when there are no arguments).
    fn emit_host_args_buffer(
        &mut self,
        scope: &mut FunctionScope,
        class: Option<&str>,
        args: &[Expr],
    ) -> Result<usize> {
        if args.is_empty() {
            scope.emit("i32.const 0");
            return Ok(self.alloc_rooted_scratch(scope));
        }
        scope.emit(format!("i32.const {}", args.len() * 4));
        scope.emit("i32.const 20 ;; arg buffer (ArrayData)");
        scope.emit("call $malloc");
        let buffer = self.alloc_rooted_scratch(scope);
        for (i, arg) in args.iter().enumerate() {
            scope.emit(format!("local.get {buffer}"));
            scope.emit(format!("i32.const {}", i * 4));
            scope.emit("i32.add");
            let arg_ty = self.compile_expr(scope, class, arg)?;
            self.convert_to_host(scope, arg_ty);
            scope.emit("i32.store");
        }
        Ok(buffer)
    }

    /// Converts a primitive on the stack into a host handle; host values
    /// pass through unchanged.
    fn convert_to_host(&self, scope: &mut FunctionScope, ty: DataType) {
        match ty {
            DataType::String => scope.emit("call $host_from_string"),
            DataType::Int | DataType::Bool => scope.emit("call $host_from_int"),
            _ => {}
        }
    }
}
