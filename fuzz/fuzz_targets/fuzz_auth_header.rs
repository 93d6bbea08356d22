// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use libfuzzer_sys::fuzz_target;
use otm_repository_core::engine::security_manager::parse_basic_credentials;

fuzz_target!(|header: &str| {
    if let Ok((user_id, _)) = parse_basic_credentials(header) {
        assert!(!user_id.contains(':'));
    }
});
