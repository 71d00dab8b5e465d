//! Bundled user programs
//!
//! Small images exercising the syscall ABI the way a user program would:
//! - `syscalls.coff`: file syscall self-test, exits 0 on success
//! - `exec.coff`: spawns and joins children in a loop
//! - `test.coff`: trivial child, exits with its argument count
//! - `echo.coff`: prints its arguments

use crate::kernel::{program_fn, Kernel, UserContext};

const SMALL: usize = 64;
const LARGE: usize = 2560;

/// Register every bundled image with the kernel's loader
pub fn install(kernel: &Kernel) {
    kernel.register_program("syscalls.coff", program_fn(2, syscall_suite));
    kernel.register_program("exec.coff", program_fn(1, exec_loop));
    kernel.register_program("test.coff", program_fn(1, |_, args| args.len() as i32));
    kernel.register_program("echo.coff", program_fn(1, echo));
}

/// Write a line to the console
fn println(ctx: &UserContext, line: &str) {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    ctx.write(1, &bytes, bytes.len());
}

fn fail(ctx: &UserContext, msg: &str) -> i32 {
    println(ctx, &format!("[ERROR] {}", msg));
    1
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'0' + (i % 64) as u8).collect()
}

/// Write `data` to a fresh file, reopen it, and compare what comes back
fn round_trip(ctx: &UserContext, name: &str, data: &[u8]) -> Result<(), String> {
    let fd = ctx.creat(name);
    if fd < 0 {
        return Err(format!("creat failed for {}", name));
    }
    let wrote = ctx.write(fd, data, data.len());
    if wrote != data.len() as i32 {
        return Err(format!("write to {} returned {}", name, wrote));
    }
    ctx.close(fd);

    let fd = ctx.open(name);
    if fd < 0 {
        return Err(format!("open failed for {}", name));
    }
    let mut back = vec![0u8; data.len()];
    let read = ctx.read(fd, &mut back, data.len());
    ctx.close(fd);
    if read != data.len() as i32 {
        return Err(format!("read from {} returned {}", name, read));
    }
    match back.iter().zip(data).position(|(a, b)| a != b) {
        Some(i) => Err(format!("{} differs at byte {}", name, i)),
        None => Ok(()),
    }
}

fn syscall_suite(ctx: &UserContext, _args: &[String]) -> i32 {
    // Repeated create/close/unlink must not leak descriptors
    for i in 0..15 {
        let fd = ctx.creat("testFile.txt");
        if fd < 0 {
            return fail(ctx, &format!("creat failed on attempt {}", i));
        }
        if ctx.close(fd) < 0 {
            return fail(ctx, &format!("close failed on attempt {}", i));
        }
        if ctx.unlink("testFile.txt") < 0 {
            return fail(ctx, &format!("unlink failed on attempt {}", i));
        }
    }
    println(ctx, "[INFO] creat/close/unlink x15 ok");

    if let Err(e) = round_trip(ctx, "testFile2.txt", &pattern(SMALL)) {
        return fail(ctx, &e);
    }
    println(ctx, &format!("[INFO] {} byte round trip ok", SMALL));

    // Unlink while open: the descriptor keeps working, the name is gone
    let fd = ctx.open("testFile2.txt");
    if ctx.unlink("testFile2.txt") < 0 {
        return fail(ctx, "unlink of open file failed");
    }
    let mut buf = [0u8; SMALL];
    if ctx.read(fd, &mut buf, SMALL) != SMALL as i32 {
        return fail(ctx, "read after unlink failed");
    }
    if ctx.close(fd) < 0 || ctx.open("testFile2.txt") >= 0 {
        return fail(ctx, "unlinked file could be reopened");
    }
    println(ctx, "[INFO] unlink while open ok");

    if let Err(e) = round_trip(ctx, "XLTestFile.txt", &pattern(LARGE)) {
        return fail(ctx, &e);
    }
    ctx.unlink("XLTestFile.txt");
    println(ctx, &format!("[INFO] {} byte round trip ok", LARGE));

    0
}

fn exec_loop(ctx: &UserContext, args: &[String]) -> i32 {
    let rounds = args.first().and_then(|a| a.parse().ok()).unwrap_or(10);

    for _ in 0..rounds {
        let child = ctx.exec("test.coff", &["TESTING"]);
        if child < 0 {
            return fail(ctx, "exec of test.coff failed");
        }
        let mut status = 0;
        if ctx.join(child, &mut status) != 1 {
            return fail(ctx, &format!("join of {} failed", child));
        }
        println(ctx, &format!("child pid: {} status: {}", child, status));
    }
    println(ctx, "FINISHED!");
    0
}

fn echo(ctx: &UserContext, args: &[String]) -> i32 {
    println(ctx, &args.join(" "));
    0
}
