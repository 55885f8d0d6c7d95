#![no_main]

use libfuzzer_sys::fuzz_target;
use testrig_types::{
    ENV_TEST_HOST, ENV_TEST_IS_CLUSTER, ENV_TEST_PASS, ENV_TEST_PORT, ENV_TEST_SCHEME,
    ENV_TEST_USER,
};

// Newline-separated values, one per TEST_NEO4J_* variable.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let values: Vec<&str> = s.split('\n').collect();
    let keys = [
        ENV_TEST_SCHEME,
        ENV_TEST_HOST,
        ENV_TEST_PORT,
        ENV_TEST_USER,
        ENV_TEST_PASS,
        ENV_TEST_IS_CLUSTER,
    ];

    let lookup = |key: &str| {
        let i = keys.iter().position(|k| *k == key)?;
        values.get(i).map(|v| v.to_string())
    };

    if let Ok(conn) = testrig_domain::StressConnection::from_lookup(lookup) {
        assert!(conn.uri.contains("://"));
        let _ = conn.child_env();
        let _ = conn.filter();
    }
});
