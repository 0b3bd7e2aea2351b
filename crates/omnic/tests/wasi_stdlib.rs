//! The wasi-only stdlib surface: syscall imports, fs/path/std/process
//! recognisers, spawn, and target gating.

mod common;

use common::{assert_compile_error, assert_ordered, compile_wasi};
use omnic::Target;

#[test]
fn wasi_imports_bind_by_name() {
    let wat = compile_wasi("function main(): int { return 0; }").unwrap();
    for name in [
        "fd_write",
        "path_open",
        "fd_close",
        "fd_read",
        "fd_filestat_get",
        "args_sizes_get",
        "args_get",
        "environ_sizes_get",
        "environ_get",
        "path_unlink_file",
        "path_create_directory",
        "path_remove_directory",
        "path_filestat_get",
        "proc_exit",
    ] {
        assert!(
            wat.contains(&format!("(import \"wasi_snapshot_preview1\" \"{name}\"")),
            "missing wasi import {name}"
        );
    }
    assert!(wat.contains("(import \"env\" \"thread_spawn\" (func $thread_spawn (param i32 i32)))"));
}

#[test]
fn fs_family_lowering() {
    let src = "
        function main(): int {
            fs.writeFile(\"out.txt\", \"data\");
            let content = fs.readFile(\"out.txt\");
            let present = fs.existsSync(\"out.txt\");
            fs.unlinkSync(\"out.txt\");
            fs.mkdirSync(\"d\");
            fs.rmdirSync(\"d\");
            return 0;
        }
    ";
    let wat = compile_wasi(src).unwrap();
    for helper in [
        "call $fs_writeFile",
        "call $fs_readFile",
        "call $fs_existsSync",
        "call $fs_unlink",
        "call $fs_mkdir",
        "call $fs_rmdir",
    ] {
        assert!(wat.contains(helper), "missing {helper}");
    }
}

#[test]
fn fs_sync_spellings_share_the_helpers() {
    let src = "
        function main(): int {
            fs.writeFileSync(\"f\", \"x\");
            let c = fs.readFileSync(\"f\");
            return 0;
        }
    ";
    let wat = compile_wasi(src).unwrap();
    assert!(wat.contains("call $fs_writeFile"));
    assert!(wat.contains("call $fs_readFile"));
}

#[test]
fn fs_is_rejected_off_target() {
    assert_compile_error(
        "function main(): int { fs.writeFile(\"a\", \"b\"); return 0; }",
        Target::Browser,
        "fs.writeFile is only supported in WASI target",
    );
}

#[test]
fn path_join_folds_left() {
    let src = "function main(): int { let p = path.join(\"a\", \"b\", \"c\"); return 0; }";
    let wat = compile_wasi(src).unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $main",
            "i32.const 9216 ;; \"a\"",
            "i32.const 9218 ;; \"b\"",
            "call $path_join2",
            "i32.const 9220 ;; \"c\"",
            "call $path_join2",
        ],
    );
}

#[test]
fn path_helpers_lower_to_runtime_calls() {
    let src = "
        function main(): int {
            let b = path.basename(\"/a/b.txt\");
            let d = path.dirname(\"/a/b.txt\");
            let e = path.extname(\"/a/b.txt\");
            return 0;
        }
    ";
    let wat = compile_wasi(src).unwrap();
    assert!(wat.contains("call $path_basename"));
    assert!(wat.contains("call $path_dirname"));
    assert!(wat.contains("call $path_extname"));
}

#[test]
fn std_args_materialises_an_array() {
    let wat = compile_wasi("function main(): int { let a = std.args(); return a.length; }").unwrap();
    assert_ordered(&wat, &["(func $main", "call $std_args", "call $array_length"]);
}

#[test]
fn process_env_materialises_a_map() {
    let wat =
        compile_wasi("function main(): int { let e = process.env; return e[\"HOME\"]; }").unwrap();
    assert_ordered(&wat, &["(func $main", "call $process_env"]);
    // A map-typed receiver dispatches the index through map_get
    assert!(wat.contains("call $map_get"));
}

#[test]
fn process_exit_emits_unreachable() {
    let wat = compile_wasi("function main(): int { process.exit(3); return 0; }").unwrap();
    assert_ordered(
        &wat,
        &["(func $main", "i32.const 3", "call $proc_exit", "unreachable"],
    );
}

#[test]
fn int_to_string_builtin() {
    let wat = compile_wasi("function main(): int { let s = int_to_string(42); return s.length; }")
        .unwrap();
    assert_ordered(&wat, &["(func $main", "i32.const 42", "call $itos", "call $strlen"]);
}

#[test]
fn spawn_packages_arguments_into_a_managed_array() {
    let src = "
        function worker(n: int): int { return n; }
        function main(): int { spawn worker(5); return 0; }
    ";
    let wat = compile_wasi(src).unwrap();
    assert_ordered(
        &wat,
        &[
            "(func $main",
            "i32.const 1",
            "call $array_new",
            "i32.const 5",
            "call $array_push",
            "i32.const 9216 ;; \"worker\"",
            "call $thread_spawn",
        ],
    );
    // The target function is exported by name for host dispatch
    assert!(wat.contains("(func $worker (export \"worker\")"));
}

#[test]
fn spawn_is_rejected_off_target() {
    assert_compile_error(
        "function worker(): int { return 0; } function main(): int { spawn worker(); return 0; }",
        Target::Browser,
        "spawn is only supported in WASI target",
    );
}

#[test]
fn unknown_global_fails_in_wasi_mode() {
    assert_compile_error(
        "function main(): int { frobnicate(); return 0; }",
        Target::Wasi,
        "unknown function or global in WASI mode: frobnicate",
    );
}

#[test]
fn unknown_identifier_fails_in_wasi_mode() {
    assert_compile_error(
        "function main(): int { return nowhere; }",
        Target::Wasi,
        "undefined variable: nowhere",
    );
}
