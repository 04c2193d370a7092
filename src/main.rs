//! FutureCal CLI
//!
//! Command-line front end over the dashboard operations:
//! - Sign in, register and sign out
//! - Products, sales and this month's top sellers
//! - Calendar events
//! - Onboarding survey

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Local, NaiveDate};
use clap::{Parser, Subcommand};
use futurecal::backend::{DataStore, HttpBackend, IdentityProvider, MemoryBackend};
use futurecal::forms::{Credentials, EventForm, ProductForm, SaleForm, SurveyForm, QUESTIONS};
use futurecal::{
    generate_default_config, logging, month_start, AuthOutcome, Config, Dashboard, MonthGrid,
    NewEvent, NewProduct, NewSale, Platform, SessionManager, SessionPhase,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEMO_EMAIL: &str = "demo@futurecal.app";
const DEMO_PASSWORD: &str = "demo123";

#[derive(Parser)]
#[command(name = "futurecal")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Business dashboard and event calendar")]
#[command(long_about = "FutureCal tracks products and sales, ranks this month's top sellers,\nand keeps a shared calendar of business events.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: ./futurecal.toml, then the user config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Use an in-memory backend with sample data, signed in as the demo user
    #[arg(long, global = true)]
    pub demo: bool,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    Login {
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Create an account
    Register {
        email: String,
        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Answer the onboarding survey (no answers: list the questions)
    Survey {
        /// Option number for each of the four questions, e.g. `2 6 1 3`
        answers: Vec<usize>,
    },

    /// List products
    Products,

    /// Add a product
    AddProduct {
        name: String,
        /// Unit price
        #[arg(long)]
        price: String,
        /// Marketplace (mercadolibre, tiendanube, shopify)
        #[arg(long, default_value = "mercadolibre")]
        platform: String,
        /// Listing ID on the marketplace
        #[arg(long)]
        platform_id: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image_url: String,
    },

    /// Record a sale
    Sell {
        /// Product ID
        product: String,
        #[arg(short, long, default_value = "1")]
        quantity: String,
        /// Total amount (default: price × quantity)
        #[arg(short, long)]
        total: Option<String>,
        /// Sale date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// List sales
    Sales,

    /// Show this month's top sellers
    Top,

    /// List events
    Events {
        /// Only events on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Add an event
    AddEvent {
        title: String,
        #[arg(short, long)]
        description: String,
        /// Day, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// Time, HH:MM
        #[arg(long, default_value = "09:00")]
        time: String,
    },

    /// Edit one of your events
    EditEvent {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        time: Option<String>,
    },

    /// Delete one of your events
    DeleteEvent { id: String },

    /// Show a month of the calendar
    Calendar {
        /// Month as YYYY-MM (default: current month)
        month: Option<String>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Config { output } = &cli.command {
        return write_default_config(output.as_deref());
    }

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {}", e);
    }

    let (identity, store) = connect(&cli, &config).await?;
    let session = SessionManager::new(identity, store.clone(), config.session_config());
    session.start().await;
    let dashboard = Dashboard::with_config(session.clone(), store, &config.session_config());

    let result = run(&cli, &dashboard).await;
    session.shutdown();
    result
}

async fn connect(
    cli: &Cli,
    config: &Config,
) -> Result<(Arc<dyn IdentityProvider>, Arc<dyn DataStore>)> {
    if cli.demo {
        let backend = Arc::new(MemoryBackend::new());
        seed_demo(&backend).await?;
        let identity: Arc<dyn IdentityProvider> = backend.clone();
        let store: Arc<dyn DataStore> = backend;
        return Ok((identity, store));
    }

    let backend_config = config
        .backend_config()
        .context("Backend is not configured (see `futurecal config`, or try --demo)")?;
    let backend = Arc::new(HttpBackend::new(backend_config)?);
    let identity: Arc<dyn IdentityProvider> = backend.clone();
    let store: Arc<dyn DataStore> = backend;
    Ok((identity, store))
}

async fn run(cli: &Cli, dashboard: &Dashboard) -> Result<()> {
    let session = dashboard.session();
    let json = cli.format == "json";

    match &cli.command {
        Commands::Login { email, password } => {
            let credentials = Credentials::new(email.as_str(), password.as_str());
            credentials.validate()?;
            let outcome = session
                .login(credentials.email(), &credentials.password)
                .await;
            report_auth(outcome)?;
        }

        Commands::Register { email, password } => {
            let credentials = Credentials::new(email.as_str(), password.as_str());
            credentials.validate()?;
            let outcome = session
                .register(credentials.email(), &credentials.password)
                .await;
            report_auth(outcome)?;
        }

        Commands::Logout => {
            session.logout().await;
            println!("Signed out.");
        }

        Commands::Whoami => {
            let state = session.state();
            if json {
                return print_json(&state);
            }
            match (state.phase(), &state.user) {
                (SessionPhase::Unauthenticated | SessionPhase::Loading, _) | (_, None) => {
                    println!("Not signed in.");
                }
                (phase, Some(user)) => {
                    println!("{} ({})", user.email, phase);
                    println!("User ID: {}", user.id);
                    if let Some(filters) = &user.filters {
                        println!();
                        for (question, answer) in QUESTIONS.iter().zip(filters.answers()) {
                            println!("{}", question.title);
                            println!("  {}", answer);
                        }
                    }
                }
            }
        }

        Commands::Survey { answers } => {
            if answers.is_empty() {
                print_questions();
                return Ok(());
            }
            if answers.len() != QUESTIONS.len() {
                bail!(
                    "Expected {} answers, got {}",
                    QUESTIONS.len(),
                    answers.len()
                );
            }

            let mut form = SurveyForm::new();
            for &answer in answers {
                let Some(index) = answer.checked_sub(1) else {
                    bail!("Options are numbered from 1");
                };
                form.select_option(index)?;
                form.next()?;
            }

            dashboard.submit_survey(&form).await?;
            println!("Thanks! Your answers were saved.");
        }

        Commands::Products => {
            let products = dashboard.products().await?;
            if json {
                return print_json(&products);
            }
            if products.is_empty() {
                println!("No products yet.");
                println!();
                println!("Add your first product with:");
                println!("  futurecal add-product \"Yerba Mate 1kg\" --price 4500 --platform-id MLA-1001");
                return Ok(());
            }
            println!(
                "{:<38} {:<24} {:>10} {:<14} {}",
                "ID", "Name", "Price", "Platform", "Listing"
            );
            println!("{}", "-".repeat(100));
            for p in &products {
                println!(
                    "{:<38} {:<24} {:>10.2} {:<14} {}",
                    p.id,
                    truncate(&p.name, 24),
                    p.price,
                    p.platform.display_name(),
                    p.platform_id
                );
            }
        }

        Commands::AddProduct {
            name,
            price,
            platform,
            platform_id,
            description,
            image_url,
        } => {
            let form = ProductForm {
                name: name.clone(),
                description: description.clone(),
                price: price.clone(),
                image_url: image_url.clone(),
                platform: platform.clone(),
                platform_id: platform_id.clone(),
            };
            let product = dashboard.create_product(&form).await?;
            println!("Created product {} ({})", product.name, product.id);
        }

        Commands::Sell {
            product,
            quantity,
            total,
            date,
        } => {
            let products = dashboard.products().await?;
            let mut form = SaleForm::new(date.unwrap_or_else(today));
            form.select_product(product.as_str(), &products);
            form.set_quantity(quantity.as_str(), &products);
            if let Some(total) = total {
                form.set_total_amount(total.as_str());
            }

            let sale = dashboard.record_sale(&form, &products).await?;
            println!(
                "Recorded sale of {} unit(s) for {:.2} on {}",
                sale.quantity, sale.total_amount, sale.sale_date
            );
        }

        Commands::Sales => {
            let sales = dashboard.sales().await?;
            if json {
                return print_json(&sales);
            }
            if sales.is_empty() {
                println!("No sales recorded yet.");
                return Ok(());
            }
            let products = dashboard.products().await?;
            println!(
                "{:<12} {:<24} {:>5} {:>12} {}",
                "Date", "Product", "Qty", "Total", "Platform"
            );
            println!("{}", "-".repeat(70));
            for sale in &sales {
                let name = products
                    .iter()
                    .find(|p| p.id == sale.product_id)
                    .map(|p| p.name.as_str())
                    .unwrap_or("(deleted)");
                println!(
                    "{:<12} {:<24} {:>5} {:>12.2} {}",
                    sale.sale_date,
                    truncate(name, 24),
                    sale.quantity,
                    sale.total_amount,
                    sale.platform.display_name()
                );
            }
        }

        Commands::Top => {
            let top = dashboard.top_products_this_month().await?;
            if json {
                return print_json(&top);
            }
            let grid = MonthGrid::containing(today());
            println!("Top sellers, {}", grid.title());
            println!();
            if top.is_empty() {
                println!("No sales this month yet.");
                return Ok(());
            }
            for (rank, entry) in top.iter().enumerate() {
                println!(
                    "{}. {:<24} {:>5} sold  {:>12.2}  ({})",
                    rank + 1,
                    truncate(&entry.product.name, 24),
                    entry.total_sales,
                    entry.total_revenue,
                    entry.product.platform.display_name()
                );
            }
        }

        Commands::Events { date } => {
            let events = match date {
                Some(date) => dashboard.events_on(*date).await?,
                None => dashboard.events().await?,
            };
            if json {
                return print_json(&events);
            }
            if events.is_empty() {
                println!("No events.");
                return Ok(());
            }
            let user_id = session.current_user().map(|u| u.id).unwrap_or_default();
            for event in &events {
                let mine = if event.is_owned_by(&user_id) { "*" } else { " " };
                println!(
                    "{} {} {}  {:<30} {}",
                    mine,
                    event.date,
                    event.short_time(),
                    truncate(&event.title, 30),
                    event.id
                );
            }
            println!();
            println!("* created by you");
        }

        Commands::AddEvent {
            title,
            description,
            date,
            time,
        } => {
            let form = EventForm::for_date(*date)
                .title(title.as_str())
                .description(description.as_str())
                .time(time.as_str());
            let event = dashboard.create_event(&form).await?;
            println!(
                "Created event '{}' on {} at {} ({})",
                event.title,
                event.date,
                event.short_time(),
                event.id
            );
        }

        Commands::EditEvent {
            id,
            title,
            description,
            date,
            time,
        } => {
            let events = dashboard.events().await?;
            let Some(event) = events.iter().find(|e| &e.id == id) else {
                bail!("Event not found: {}", id);
            };

            let mut form = EventForm::from_event(event);
            if let Some(title) = title {
                form.title = title.clone();
            }
            if let Some(description) = description {
                form.description = description.clone();
            }
            if let Some(date) = date {
                form.date = Some(*date);
            }
            if let Some(time) = time {
                form.time = time.clone();
            }

            let updated = dashboard.update_event(id, &form).await?;
            println!("Updated event '{}'", updated.title);
        }

        Commands::DeleteEvent { id } => {
            // Load events so ownership can be checked locally
            dashboard.events().await?;
            dashboard.delete_event(id).await?;
            println!("Deleted event {}", id);
        }

        Commands::Calendar { month } => {
            let grid = match month {
                Some(month) => parse_month(month)?,
                None => MonthGrid::containing(today()),
            };
            let events = dashboard.events().await?;
            print_calendar(&grid, &events);
        }

        Commands::Config { output } => write_default_config(output.as_deref())?,
    }

    Ok(())
}

fn report_auth(outcome: AuthOutcome) -> Result<()> {
    match outcome {
        AuthOutcome::SignedIn(user) => {
            println!("Signed in as {}", user.email);
            if !user.has_completed_segmentation {
                println!();
                println!("Tell us about your business to finish setting up:");
                println!("  futurecal survey");
            }
            Ok(())
        }
        AuthOutcome::ConfirmationPending { message } => {
            println!("{}", message);
            Ok(())
        }
        AuthOutcome::Failed(failure) => bail!("{}", failure.message),
    }
}

fn print_questions() {
    for question in &QUESTIONS {
        println!("{}", question.title);
        println!("   {}", question.subtitle);
        for (i, option) in question.options.iter().enumerate() {
            println!("   {}) {}", i + 1, option);
        }
        println!();
    }
    println!("Answer with one option number per question, e.g.:");
    println!("  futurecal survey 2 6 1 3");
}

fn print_calendar(grid: &MonthGrid, events: &[futurecal::Event]) {
    let by_day = grid.events_by_day(events);

    println!("{:^27}", grid.title());
    println!(" Su  Mo  Tu  We  Th  Fr  Sa");
    for week in grid.weeks() {
        let line: String = week
            .iter()
            .map(|cell| match cell {
                Some(day) => {
                    let marker = if by_day.contains_key(day) { '*' } else { ' ' };
                    format!("{:>3}{}", day.day(), marker)
                }
                None => "    ".to_string(),
            })
            .collect();
        println!("{}", line.trim_end());
    }

    if by_day.is_empty() {
        return;
    }
    println!();
    for (day, events) in &by_day {
        println!("{}", day.format("%a %d"));
        for event in events {
            println!("  {}  {}", event.short_time(), event.title);
        }
    }
}

fn parse_month(value: &str) -> Result<MonthGrid> {
    let (year, month) = value
        .split_once('-')
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", value))?;
    let year: i32 = year.parse().context("Invalid year")?;
    let month: u32 = month.parse().context("Invalid month")?;
    MonthGrid::for_month(year, month)
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", value))
}

fn write_default_config(output: Option<&Path>) -> Result<()> {
    let content = generate_default_config();
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {:?}", path))?;
            println!("Wrote default config to {:?}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Sample account, catalog and calendar for `--demo`
async fn seed_demo(backend: &MemoryBackend) -> Result<()> {
    let user = backend.add_account(DEMO_EMAIL, DEMO_PASSWORD);
    backend.set_session(backend.session_for(DEMO_EMAIL));

    let mut survey = SurveyForm::new();
    for option in [1, 5, 1, 0] {
        survey.select_option(option)?;
        survey.next()?;
    }
    backend
        .upsert_user_filters(&user.id, &survey.to_filters()?)
        .await?;

    let catalog = [
        ("Yerba Mate 1kg", 4500.0, Platform::MercadoLibre, "MLA-1001"),
        ("Steel Thermos 1L", 32000.0, Platform::TiendaNube, "TN-2002"),
        ("Alpaca Bombilla", 8900.0, Platform::Shopify, "SH-3003"),
        ("Gourd Mate", 12500.0, Platform::MercadoLibre, "MLA-1004"),
    ];
    let mut products = Vec::new();
    for (name, price, platform, platform_id) in catalog {
        let product = backend
            .create_product(&NewProduct {
                name: name.to_string(),
                description: String::new(),
                price,
                image_url: None,
                platform,
                platform_id: platform_id.to_string(),
                user_id: user.id.clone(),
            })
            .await?;
        products.push(product);
    }

    let sale_day = month_start(today());
    for (product, quantity) in products.iter().zip([12u32, 3, 7, 2]) {
        backend
            .create_sale(&NewSale {
                product_id: product.id.clone(),
                quantity,
                total_amount: product.price * f64::from(quantity),
                sale_date: sale_day,
                platform: product.platform,
                user_id: user.id.clone(),
            })
            .await?;
    }

    for (title, description, offset, time) in [
        ("Hot Sale", "Prepare stock and promotions", 0, "09:00"),
        ("Supplier call", "Renegotiate thermos prices", 2, "15:30"),
    ] {
        backend
            .create_event(&NewEvent {
                title: title.to_string(),
                description: description.to_string(),
                date: today() + chrono::Duration::days(offset),
                time: time.to_string(),
                created_by: user.id.clone(),
            })
            .await?;
    }

    tracing::debug!(user_id = %user.id, "Demo data seeded");
    Ok(())
}
