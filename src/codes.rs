// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 iProvidence

//! Envelope result codes.
//!
//! These are the string codes the frontend switches on. They are not HTTP
//! statuses; the status is chosen separately from the error kind.

pub const OK: &str = "200";
pub const CREATED: &str = "201";
pub const NO_CONTENT: &str = "204";

pub const INVALID_RESET_TOKEN: &str = "104";
pub const ACCESS_DENIED: &str = "105";
pub const TOKEN_MISSING: &str = "111";

pub const BODY_PARSE_FAILED: &str = "301";
pub const INSERT_FAILED: &str = "303";
pub const UPDATE_FAILED: &str = "304";
pub const TOKEN_GENERATION_FAILED: &str = "305";
pub const RESPONSE_PARSE_FAILED: &str = "310";
pub const DELETE_FAILED: &str = "314";

pub const VALIDATION_FAILED: &str = "400";
pub const UNAUTHORIZED: &str = "401";
pub const NOT_FOUND: &str = "404";
pub const UPSTREAM_REQUEST_FAILED: &str = "405";
pub const CONFLICT: &str = "409";
pub const INTERNAL: &str = "500";
pub const FETCH_FAILED: &str = "502";
pub const SERVICE_UNAVAILABLE: &str = "503";
