//! List command implementation

use crate::backends::available_backends;

/// List all compiled-in bus backends
pub fn list_backends() {
    let backends = available_backends();
    if backends.is_empty() {
        println!("No backends available (recompile with backend features enabled)");
        return;
    }

    println!("Supported backends:");
    println!();
    for b in &backends {
        println!("  {:10} - {}", b.name, b.description);
        if !b.aliases.is_empty() {
            println!("  {:10}   aliases: {}", "", b.aliases.join(", "));
        }
    }
    println!();
    println!("GPIO lines (--reset, --irq) take chip:offset, e.g. gpiochip0:25");
}
