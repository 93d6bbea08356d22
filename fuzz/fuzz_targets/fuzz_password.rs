// Copyright 2026 BadCompany
// Licensed under the Apache License, Version 2.0

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use otm_repository_core::engine_core::password::PasswordValidator;

#[derive(Debug, Arbitrary)]
struct Input {
    credentials: String,
    stored: String,
}

fuzz_target!(|input: Input| {
    // Malformed stored values (bad base64, short hashes) yield false, never a panic.
    if let Ok(validator) = PasswordValidator::new(Some("SHA-1"), None) {
        let _ = validator.is_valid_password(&input.credentials, &input.stored);
    }
});
