//! CSR entry point: mounts the app to the document body.

use concept_graph_canvas::{App, init_logging};
use leptos::prelude::*;

fn main() {
	init_logging();
	mount_to_body(App);
}
