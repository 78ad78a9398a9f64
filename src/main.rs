use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use bill_review::{
    AccountRegistry, AccountType, AggregationService, Config, DetailEntry, ItemIdentity, Location,
    RecordStore, ReviewEntry, ReviewKind, ReviewPost, Verdict,
};

const USAGE: &str = "usage:
  bill-review signup <username> <credential-hash> [regular|admin|business]
  bill-review review <username> <post.json>
  bill-review detail <username> <serial> <value> <series> <entry.json>
  bill-review show <serial> <value> <series> [username]
  bill-review ledger <username> <serial> <value> <series>";

/// Review payload as sent by clients; who posted it comes from the account
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostFile {
    identity: ItemIdentity,
    #[serde(default)]
    location: Location,
    date: String,
    #[serde(default)]
    comment: String,
    type_of_review: String,
    #[serde(default)]
    rating: i64,
    #[serde(default)]
    defects: Vec<String>,
    #[serde(default)]
    detail: Option<DetailEntry>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env()?;
    let store = RecordStore::open(&config)
        .with_context(|| format!("Could not open store at {}", config.db_path().display()))?;
    let service = AggregationService::new(store.clone());
    let accounts = AccountRegistry::new(store);

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["signup", username, credential, rest @ ..] => {
            let account_type = match rest.first() {
                Some(kind) => kind.parse::<AccountType>()?,
                None => AccountType::Regular,
            };
            let account = accounts.create_account(username, credential, account_type)?;
            log::info!("✓ Created {} account {}", account_type.as_str(), account.id);
            print_json(&account.public())
        }
        ["review", username, path] => {
            let account = accounts.account(username)?;
            let post: PostFile = read_json(Path::new(path))?;

            let verdict = match post.type_of_review.parse::<ReviewKind>()? {
                ReviewKind::Good => Verdict::Good { rating: post.rating },
                ReviewKind::Bad => Verdict::Bad {
                    defects: post.defects,
                },
            };
            let review = ReviewEntry {
                submitter_id: account.id.clone(),
                location: post.location,
                date: post.date,
                comment: post.comment,
                verdict,
            };

            let aggregate = service.submit_post(ReviewPost {
                identity: post.identity,
                review,
                class: account.reviewer_class(),
                detail: post.detail,
            })?;
            log::info!("✓ Review stored for {}", aggregate.identity);
            print_json(&aggregate)
        }
        ["detail", username, serial, value, series, path] => {
            let account = accounts.account(username)?;
            let identity = ItemIdentity::new(*serial, *value, *series)?;
            let entry: DetailEntry = read_json(Path::new(path))?;

            let ledger = service.submit_detail(&account.id, &identity, entry)?;
            log::info!("✓ Ledger for {} now has {} pairs", identity, ledger.len());
            print_json(&ledger)
        }
        ["show", serial, value, series] => {
            let identity = ItemIdentity::new(*serial, *value, *series)?;
            print_json(&service.review_summary(&identity)?)
        }
        ["show", serial, value, series, username] => {
            let account = accounts.account(username)?;
            let identity = ItemIdentity::new(*serial, *value, *series)?;
            print_json(&service.item_report(&identity, &account.id)?)
        }
        ["ledger", username, serial, value, series] => {
            let account = accounts.account(username)?;
            let identity = ItemIdentity::new(*serial, *value, *series)?;
            match service.get_ledger(&account.id, &identity)? {
                Some(ledger) => print_json(&ledger),
                None => bail!("{} has no details for {}", username, identity),
            }
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
