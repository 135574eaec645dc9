use chrono::Utc;
use clap::{Parser, Subcommand};
use mandal_core::catalog::Catalog;
use mandal_core::events::EventCalendar;
use mandal_core::payment::{parse_amount, PaymentRequest, UpiLinkBuilder, DEFAULT_QR_SIZE};
use mandal_core::receipt::{Customer, Order, OrderItem, ReceiptGenerator};
use mandal_core::repositories::file::FileOrderRepository;
use mandal_core::repositories::OrderRepository;
use mandal_core::{CoreConfig, MandalError, ShardableUuid};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mandal")]
#[command(about = "Mandal festival site CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a UPI payment link
    PayLink {
        /// Amount in rupees, for example 501 or 1001.50
        amount: String,
        /// Payee UPI id (defaults to UPI_PAYEE_ID)
        #[arg(long)]
        payee_id: Option<String>,
        /// Payee display name (defaults to UPI_PAYEE_NAME)
        #[arg(long)]
        payee_name: Option<String>,
        /// Transaction note
        #[arg(long)]
        note: Option<String>,
    },
    /// Write a payment link as an SVG QR code
    Qr {
        /// Amount in rupees
        amount: String,
        /// Output file
        #[arg(long, default_value = "payment.svg")]
        out: PathBuf,
        /// Edge length in pixels
        #[arg(long, default_value_t = DEFAULT_QR_SIZE)]
        size: u32,
        /// Transaction note
        #[arg(long)]
        note: Option<String>,
    },
    /// Search the photo catalog
    Catalog {
        /// Text matched against name and description (empty lists everything)
        #[arg(default_value = "")]
        query: String,
        /// Only entries in this category
        #[arg(long)]
        category: Option<String>,
    },
    /// List upcoming events
    Events {
        /// Events YAML file (defaults to MANDAL_EVENTS_FILE)
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Render a receipt without storing it
    Receipt {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        address: String,
        /// Line item as DESCRIPTION:QUANTITY:UNIT_PRICE; repeat for more items
        #[arg(long = "item", required = true)]
        items: Vec<String>,
    },
    /// List stored orders
    Orders,
    /// Print the receipt of a stored order
    ShowOrder {
        /// Order id (32 lowercase hex characters)
        order_id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let cfg = CoreConfig::from_lookup(|key| std::env::var(key).ok())?;

    match cli.command {
        Some(Commands::PayLink {
            amount,
            payee_id,
            payee_name,
            note,
        }) => {
            let builder = UpiLinkBuilder::new(cfg.payment().clone());
            let request = PaymentRequest {
                amount: parse_amount(&amount)?,
                payee_id: payee_id.unwrap_or_else(|| cfg.payment().payee_id().to_owned()),
                payee_name: payee_name.or_else(|| cfg.payment().payee_name().map(str::to_owned)),
                note,
            };
            match builder.build(&request) {
                Ok(link) => println!("{}", link.uri()),
                Err(e) => eprintln!("Error building payment link: {}", e),
            }
        }
        Some(Commands::Qr {
            amount,
            out,
            size,
            note,
        }) => {
            let builder = UpiLinkBuilder::new(cfg.payment().clone());
            let link = builder.donation(parse_amount(&amount)?, note)?;
            std::fs::write(&out, link.qr_svg(size)?)?;
            println!("Wrote QR code for {} to {}", link.uri(), out.display());
        }
        Some(Commands::Catalog { query, category }) => {
            let catalog = Catalog::festival_photos();
            let entries = catalog.search(&query, category.as_deref());
            if entries.is_empty() {
                println!("No catalog entries found.");
            }
            for entry in entries {
                let price = entry
                    .price
                    .map(|p| format!("{} {}", cfg.receipt().currency_symbol, p))
                    .unwrap_or_else(|| "-".into());
                println!(
                    "ID: {}, Name: {}, Category: {}, Price: {}, Image: {}",
                    entry.id, entry.name, entry.category, price, entry.image_url
                );
            }
        }
        Some(Commands::Events { file }) => {
            let calendar = match file.as_deref().or(cfg.events_file()) {
                Some(path) => EventCalendar::load(path)?,
                None => EventCalendar::default(),
            };
            let upcoming = calendar.upcoming(Utc::now());
            if upcoming.is_empty() {
                println!("No upcoming events.");
            }
            for event in upcoming {
                println!(
                    "{}: {} at {} ({})",
                    event.date.format("%Y-%m-%d %H:%M"),
                    event.title,
                    event.location,
                    event.description
                );
            }
        }
        Some(Commands::Receipt {
            name,
            email,
            phone,
            address,
            items,
        }) => {
            let items = items
                .iter()
                .map(|spec| parse_item(spec))
                .collect::<Result<Vec<_>, _>>()?;
            let order = Order::new(Customer::new(name, email, phone, address)?, items)?;
            let generator = ReceiptGenerator::new(cfg.receipt().clone());
            let receipt = generator.generate(&order, Utc::now())?;
            println!("{}", generator.render(&receipt).to_text());
        }
        Some(Commands::Orders) => {
            let repo = FileOrderRepository::from_config(&cfg);
            let orders = repo.list_orders()?;
            if orders.is_empty() {
                println!("No orders found.");
            }
            for order in orders {
                println!(
                    "ID: {}, Invoice: {}, Customer: {}, Total: {}, Created: {}",
                    order.id,
                    order.invoice_number,
                    order.customer_name,
                    order.total_amount,
                    order.created_at
                );
            }
        }
        Some(Commands::ShowOrder { order_id }) => {
            let id = ShardableUuid::parse(&order_id)?;
            let repo = FileOrderRepository::from_config(&cfg);
            let order = repo.get_order(&id)?;
            let items = repo.order_items(&id)?;
            let receipt = order.to_receipt(&items)?;
            let generator = ReceiptGenerator::new(cfg.receipt().clone());
            println!("{}", generator.render(&receipt).to_text());
        }
        None => {
            println!("Use 'mandal --help' for commands");
        }
    }

    Ok(())
}

/// Parses `DESCRIPTION:QUANTITY:UNIT_PRICE`; the description may itself contain colons.
fn parse_item(spec: &str) -> Result<OrderItem, MandalError> {
    let mut parts = spec.rsplitn(3, ':');
    let (Some(price), Some(quantity), Some(description)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(MandalError::InvalidInput(format!(
            "item '{spec}' must look like DESCRIPTION:QUANTITY:UNIT_PRICE"
        )));
    };
    let quantity = quantity
        .trim()
        .parse::<u32>()
        .map_err(|e| MandalError::InvalidInput(format!("item '{spec}' quantity: {e}")))?;
    OrderItem::new(description, quantity, parse_amount(price)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_spec() {
        let item = parse_item("Puja thali: large:2:10.50").unwrap();
        assert_eq!(item.description(), "Puja thali: large");
        assert_eq!(item.quantity(), 2);
        assert_eq!(item.unit_price().to_string(), "10.50");
    }

    #[test]
    fn rejects_malformed_item_spec() {
        assert!(parse_item("Flowers:2").is_err());
        assert!(parse_item("Flowers:two:1.00").is_err());
        assert!(parse_item("Flowers:0:1.00").is_err());
        assert!(parse_item("Idol:2:79228162514264337593543950335").is_err());
        assert!(parse_item("Flowers:10001:1.00").is_err());
    }

    #[test]
    fn cli_parses_repeated_items() {
        let cli = Cli::try_parse_from([
            "mandal", "receipt", "--name", "Asha", "--email", "a@b.org", "--phone", "5551234567",
            "--address", "Khatav", "--item", "Modak:2:10", "--item", "Flowers:1:2.50",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Receipt { items, .. }) => assert_eq!(items.len(), 2),
            _ => panic!("expected receipt command"),
        }
    }
}
