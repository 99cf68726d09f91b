use std::env;

fn main() {
    // Read node configuration from environment variables (optional)
    // These are used as default values by NodeConfig::from_build_env()

    // Discovery broadcast interval in milliseconds (default: 10 s)
    if let Ok(interval) = env::var("NODE_DISCOVERY_INTERVAL_MS") {
        println!("cargo:rustc-env=NODE_DISCOVERY_INTERVAL_MS={}", interval);
        println!(
            "cargo:warning=Using NODE_DISCOVERY_INTERVAL_MS from environment: {}",
            interval
        );
    } else {
        println!("cargo:rustc-env=NODE_DISCOVERY_INTERVAL_MS=10000");
    }

    // Send completion timeout in milliseconds (0 = fire-and-forget)
    if let Ok(timeout) = env::var("NODE_SEND_TIMEOUT_MS") {
        println!("cargo:rustc-env=NODE_SEND_TIMEOUT_MS={}", timeout);
        println!(
            "cargo:warning=Using NODE_SEND_TIMEOUT_MS from environment: {}",
            timeout
        );
    } else {
        println!("cargo:rustc-env=NODE_SEND_TIMEOUT_MS=0");
    }

    // Maximum wait for the send gate on fire-and-forget sends
    if let Ok(timeout) = env::var("NODE_GATE_TIMEOUT_MS") {
        println!("cargo:rustc-env=NODE_GATE_TIMEOUT_MS={}", timeout);
        println!(
            "cargo:warning=Using NODE_GATE_TIMEOUT_MS from environment: {}",
            timeout
        );
    } else {
        println!("cargo:rustc-env=NODE_GATE_TIMEOUT_MS=100");
    }

    // Display name (empty = picked from the built-in name list)
    if let Ok(name) = env::var("NODE_NAME") {
        println!("cargo:rustc-env=NODE_NAME={}", name);
        println!("cargo:warning=Using NODE_NAME from environment: {}", name);
    } else {
        println!("cargo:rustc-env=NODE_NAME=");
    }

    // Rerun if environment variables change
    println!("cargo:rerun-if-env-changed=NODE_DISCOVERY_INTERVAL_MS");
    println!("cargo:rerun-if-env-changed=NODE_SEND_TIMEOUT_MS");
    println!("cargo:rerun-if-env-changed=NODE_GATE_TIMEOUT_MS");
    println!("cargo:rerun-if-env-changed=NODE_NAME");
}
