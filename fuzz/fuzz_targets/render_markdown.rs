#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(receipt) = serde_json::from_slice::<testrig_types::SuiteReceipt>(data) {
        let _ = testrig_app::render_markdown(&receipt);
    }
});
