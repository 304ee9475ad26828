// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `process` global object

use super::timers::{TimerQueue, rest};
use crate::error::VmError;
use hyperbox_script::Error;
use hyperbox_script::runtime::{ObjectRef, Value, arg, native_function};
use std::time::Instant;

/// Create the process object.
///
/// Only the variables named in `env_allow` are copied into `process.env`.
pub fn create_process_object(env_allow: &[String], timers: &TimerQueue) -> Value {
    let process = ObjectRef::ordinary();

    process.set("platform", Value::from(get_platform()));
    process.set("arch", Value::from(get_arch()));
    process.set("pid", Value::from(std::process::id() as f64));
    process.set("version", Value::from(format!("v{}", crate::NODE_API_VERSION)));
    process.set("title", Value::from("hyperbox"));

    let versions = ObjectRef::ordinary();
    versions.set("node", Value::from(crate::NODE_API_VERSION));
    versions.set("hyperbox", Value::from(crate::VERSION));
    versions.freeze();
    process.set("versions", Value::Object(versions));

    process.set("argv", Value::Object(ObjectRef::array(Vec::new())));

    let env = ObjectRef::ordinary();
    for name in env_allow {
        if let Ok(value) = std::env::var(name) {
            env.set(name, Value::from(value));
        }
    }
    process.set("env", Value::Object(env));

    process.set(
        "cwd",
        native_function("cwd", |_, _, _| {
            let cwd = std::env::current_dir().map_err(Error::host)?;
            Ok(Value::from(cwd.display().to_string()))
        }),
    );

    let started = Instant::now();
    process.set(
        "uptime",
        native_function("uptime", move |_, _, _| {
            Ok(Value::Number(started.elapsed().as_secs_f64()))
        }),
    );

    let queue = timers.clone();
    process.set(
        "nextTick",
        native_function("nextTick", move |_, _, args| {
            let callback = arg(args, 0);
            if !callback.is_function() {
                return Err(Error::type_error(
                    "The \"callback\" argument must be of type function",
                ));
            }
            queue.set_immediate(callback, rest(args, 1));
            Ok(Value::Undefined)
        }),
    );

    process.set(
        "exit",
        native_function("exit", |_, _, args| {
            let code = match arg(args, 0) {
                Value::Undefined => 0,
                code => code.to_number() as i32,
            };
            Err(VmError::Exit(code).into_script())
        }),
    );

    Value::Object(process)
}

/// Get the platform string
fn get_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "win32"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "freebsd") {
        "freebsd"
    } else {
        "unknown"
    }
}

/// Get the architecture string
fn get_arch() -> &'static str {
    if cfg!(target_arch = "x86_64") {
        "x64"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "x86") {
        "ia32"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_is_allow_listed() {
        // SAFETY: test-local variable, not read concurrently by other tests
        unsafe { std::env::set_var("HYPERBOX_TEST_SECRET", "hidden") };
        let process = create_process_object(&["PATH".to_string()], &TimerQueue::new());
        let Value::Object(process) = process else {
            panic!("process is not an object");
        };
        let Some(Value::Object(env)) = process.get("env") else {
            panic!("process.env missing");
        };
        assert!(!env.has_own("HYPERBOX_TEST_SECRET"));
        assert_eq!(env.has_own("PATH"), std::env::var("PATH").is_ok());
    }

    #[test]
    fn test_exit_raises_host_error() {
        let interpreter = hyperbox_script::Interpreter::new();
        let process = create_process_object(&[], &TimerQueue::new());
        let exit = interpreter.get_property(&process, "exit").unwrap();
        let err = interpreter
            .call(&exit, &process, &[Value::from(3)])
            .unwrap_err();
        assert!(matches!(VmError::from(err), VmError::Exit(3)));
    }
}
