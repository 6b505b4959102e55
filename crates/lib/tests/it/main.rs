/*! Integration tests for conftree.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * The module structure mirrors the main library structure:
 * - tree: document node addressing, path parsing, lazy search
 * - roundtrip: object/tree round trips across container shapes and
 *   default normalization
 * - olock: hash determinism, sensitivity, and end-to-end conflicts
 * - resolver: cycle resolution, pool timeouts, weak references
 * - store: contract semantics and the decorator pipeline
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("conftree=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod helpers;
mod resolver;
mod roundtrip;
mod store;
