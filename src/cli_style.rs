/*!
 * CLI output styling
 *
 * Themed text and comfy-table builders for the `enclave` binary.
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};
use enclave_proto::{ModuleInfo, Port, ServiceInfo};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

use crate::services::PortSpec;

// ============================================================================
// THEME COLORS
// ============================================================================

pub struct Theme;

impl Theme {
    pub fn primary<D: Display>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn success<D: Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: Display>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    pub fn muted<D: Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    /// Header style (bold cyan)
    pub fn header<D: Display>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }
}

pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const INFO: &'static str = "ℹ";
    pub const ARROW_RIGHT: &'static str = "→";
}

// ============================================================================
// TABLES
// ============================================================================

/// Create a styled data table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Create a minimal table (no outer borders)
pub fn create_minimal_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cell(title: &str) -> Cell {
    Cell::new(title)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn or_dash(value: &str) -> Cell {
    if value.is_empty() {
        Cell::new("-").fg(Color::DarkGrey)
    } else {
        Cell::new(value)
    }
}

/// Render wire ports as `id=80/tcp` lines, sorted by port ID
pub fn format_ports(ports: &HashMap<String, Port>) -> String {
    let sorted: BTreeMap<&String, &Port> = ports.iter().collect();
    sorted
        .into_iter()
        .map(|(id, port)| match PortSpec::from_wire(port) {
            Ok(spec) => format!("{}={}", id, spec),
            Err(_) => format!("{}=<invalid {}>", id, port.number),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One row per service, sorted by service ID
pub fn services_table(services: &BTreeMap<String, ServiceInfo>) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        header_cell("Service"),
        header_cell("Private IP"),
        header_cell("Private Ports"),
        header_cell("Public IP"),
        header_cell("Public Ports"),
    ]);

    for (id, info) in services {
        table.add_row(vec![
            Cell::new(id)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
            Cell::new(&info.private_ip_addr),
            or_dash(&format_ports(&info.private_ports)),
            or_dash(&info.maybe_public_ip_addr),
            or_dash(&format_ports(&info.maybe_public_ports)),
        ]);
    }

    table
}

/// One row per module, sorted by module ID
pub fn modules_table(modules: &BTreeMap<String, ModuleInfo>) -> Table {
    let mut table = create_table();
    table.set_header(vec![
        header_cell("Module"),
        header_cell("GUID"),
        header_cell("Private IP"),
        header_cell("Public IP"),
    ]);

    for (id, info) in modules {
        table.add_row(vec![
            Cell::new(id)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
            Cell::new(&info.guid).fg(Color::DarkGrey),
            Cell::new(&info.private_ip_addr),
            or_dash(&info.maybe_public_ip_addr),
        ]);
    }

    table
}

/// One row per enclave the engine reported
pub fn enclaves_table(enclave_ids: &BTreeSet<String>) -> Table {
    let mut table = create_table();
    table.set_header(vec![header_cell("Enclave")]);
    for id in enclave_ids {
        table.add_row(vec![Cell::new(id)
            .fg(Color::White)
            .add_attribute(Attribute::Bold)]);
    }
    table
}

/// Create a key-value table
pub fn kv_table(items: &[(&str, String)]) -> Table {
    let mut table = create_minimal_table();

    for (key, value) in items {
        table.add_row(vec![
            Cell::new(key).fg(Color::Cyan),
            Cell::new(value)
                .fg(Color::White)
                .add_attribute(Attribute::Bold),
        ]);
    }

    table
}

// ============================================================================
// MESSAGES
// ============================================================================

/// Print a styled error message with optional suggestion
pub fn print_error(message: &str, suggestion: Option<&str>) {
    eprintln!(
        "\n{} {}",
        Theme::error(format!("{} Error:", Icons::ERROR)),
        message
    );

    if let Some(hint) = suggestion {
        eprintln!(
            "  {} {}",
            Theme::muted(Icons::ARROW_RIGHT),
            Theme::muted(hint)
        );
    }
    eprintln!();
}

pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        Theme::warning(Icons::WARNING.to_string()),
        Theme::warning(message)
    );
}

pub fn print_success(message: &str) {
    println!(
        "{} {}",
        Theme::success(Icons::SUCCESS.to_string()),
        Theme::success(message)
    );
}

pub fn print_info(message: &str) {
    println!("{} {}", Theme::primary(Icons::INFO.to_string()), message);
}

/// Draw a section header with a line
pub fn section_header(title: &str) {
    let line_len = 50 - title.len().min(40);
    println!(
        "\n{} {}",
        Theme::header(title),
        Theme::muted("─".repeat(line_len))
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use enclave_proto::port::TransportProtocol;

    fn port(number: u32, protocol: TransportProtocol) -> Port {
        Port {
            number,
            transport_protocol: protocol as i32,
        }
    }

    #[test]
    fn test_format_ports_sorted() {
        let ports: HashMap<String, Port> = [
            ("http".to_string(), port(80, TransportProtocol::Tcp)),
            ("dns".to_string(), port(53, TransportProtocol::Udp)),
        ]
        .into_iter()
        .collect();

        assert_eq!(format_ports(&ports), "dns=53/udp\nhttp=80/tcp");
        assert_eq!(format_ports(&HashMap::new()), "");
    }

    #[test]
    fn test_format_ports_marks_invalid() {
        let ports: HashMap<String, Port> = [("bad".to_string(), port(70000, TransportProtocol::Tcp))]
            .into_iter()
            .collect();
        assert_eq!(format_ports(&ports), "bad=<invalid 70000>");
    }

    #[test]
    fn test_services_table_rows() {
        let mut services = BTreeMap::new();
        services.insert(
            "web".to_string(),
            ServiceInfo {
                private_ip_addr: "10.0.0.2".to_string(),
                ..Default::default()
            },
        );
        let rendered = services_table(&services).to_string();
        assert!(rendered.contains("web"));
        assert!(rendered.contains("10.0.0.2"));
    }

    #[test]
    fn test_enclaves_table_rows() {
        let ids: BTreeSet<String> = ["e2".to_string(), "e1".to_string()].into_iter().collect();
        let rendered = enclaves_table(&ids).to_string();
        let first = rendered.find("e1").unwrap();
        let second = rendered.find("e2").unwrap();
        assert!(first < second);
    }
}
