// Copyright 2026 BadCompany
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! otm-repository-core: security and eventing core of the OTM repository.
//!
//! This library authenticates repository users, resolves namespace
//! authorizations, persists security files through change sets and fans
//! repository lifecycle events out to the notification and indexing
//! services.

pub mod config;
pub mod context;
pub mod engine;
pub mod engine_core;
pub mod messaging;
pub mod persistence;
pub mod utils;
