//! Workspace-level integration tests for taskbatch live in `tests/`.
