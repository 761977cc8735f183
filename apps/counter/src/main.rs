//! Counter demo: mounts a stateful component on the in-memory host, fires
//! click events, and prints the committed host tree after each pass.

use log::info;

use weft_core::{Element, HostBackend, MemoryHost, Runtime, Scope};
use weft_runtime_std::IdlePump;

fn counter(scope: &mut Scope) -> Element {
    let (count, set_count) = scope.use_state(1i64);
    let on_click = {
        let set = set_count.clone();
        move || {
            set.update(|i| i + 1);
            set.update(|i| i + 1);
        }
    };
    Element::host("div")
        .with_child(Element::host("h1").with_child(format!("Count: {count}")))
        .with_child(
            Element::host("button")
                .with_handler("onClick", on_click)
                .with_child("+1"),
        )
}

fn main() {
    env_logger::init();

    println!("=== Weft Counter Example ===");
    println!("Each click enqueues two +1 actions; they fold on the next pass.");
    println!();

    let mut host = MemoryHost::new();
    let container = host.create_node("root");
    let mut runtime = Runtime::new(host);
    runtime.render(Element::component(counter), container);

    let mut pump = IdlePump::new(runtime);
    pump.run_until_idle().expect("initial render");
    info!("initial pass committed");
    println!("{}", pump.runtime().host().dump_tree(container));

    for round in 1..=3 {
        let button = pump
            .runtime()
            .host()
            .find_by_tag("button")
            .expect("button committed");
        pump.runtime().host().dispatch(button, "click");
        pump.run_until_idle().expect("re-render");
        info!("pass {round} committed");
        println!("after click {round}:");
        println!("{}", pump.runtime().host().dump_tree(container));
    }

    pump.handle().shutdown();
}
