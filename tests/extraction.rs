use std::collections::BTreeMap;

use soup_parser::{
    ExtractionSchema, Extract, HtmlModel, Parser, ParserRegistry, ResponseAdapter, ResponseBody,
    Result,
};

fn init_tracing() {
    // RUST_LOG=soup_parser=debug cargo test -- --nocapture
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

const ACCOUNT: &str = r#"
<html>
<head><title>Account</title></head>
<body>
    <section class="profile">
        <h1 class="user-name">Jane Doe</h1>
        <span class="followers">N/A</span>
        <span class="posts">128</span>
        <a class="homepage" href="../about">About</a>
    </section>
    <ul class="pinned">
        <li class="item">alpha</li>
        <li class="item">beta</li>
    </ul>
    <ul class="recent">
        <li class="item">gamma</li>
        <li class="item">delta</li>
        <li class="item">epsilon</li>
    </ul>
    <table class="activity">
        <tr class="day"><th>Mon</th><td>3</td></tr>
        <tr class="day"><th>Tue</th><td>5</td></tr>
        <tr class="day"><th>Mon</th><td>8</td></tr>
    </table>
</body>
</html>
"#;

#[derive(Debug, Default, Clone, PartialEq)]
struct Account {
    name: String,
    followers: i32,
    posts: i64,
    homepage: String,
    items: Vec<String>,
    activity: BTreeMap<String, i32>,
}

impl HtmlModel for Account {
    fn parser() -> Result<Parser<Self>> {
        Parser::new(Account::default, |p| {
            p.parser(".profile", |profile| {
                profile.text_into(".user-name", |a: &mut Account| &mut a.name);
                profile.int_into(".followers", |a: &mut Account| &mut a.followers);
                profile.long_into(".posts", |a: &mut Account| &mut a.posts);
                profile.value_into("a.homepage", Extract::abs_url("href"), |a: &mut Account| {
                    &mut a.homepage
                });
            });
            p.collection(".pinned .item", |n| n.text(), |a: &mut Account| &mut a.items);
            p.collection(".recent .item", |n| n.text(), |a: &mut Account| &mut a.items);
            p.map_entries(
                "tr.day",
                |entry| {
                    entry.text("th", |day, e: &mut (String, i32)| e.0 = day);
                    entry.int("td", |count, e: &mut (String, i32)| e.1 = count);
                },
                |a: &mut Account| &mut a.activity,
            );
        })
    }
}

#[test]
fn extracts_typed_account() {
    init_tracing();
    let parser = Account::parser().unwrap();
    let account = parser.parse_str(ACCOUNT, "https://social.example/users/jane/");

    assert_eq!(account.name, "Jane Doe");
    assert_eq!(account.followers, 0);
    assert_eq!(account.posts, 128);
    assert_eq!(account.homepage, "https://social.example/users/about");
    assert_eq!(
        account.items,
        vec!["alpha", "beta", "gamma", "delta", "epsilon"]
    );
    assert_eq!(account.activity.len(), 2);
    assert_eq!(account.activity["Mon"], 8);
    assert_eq!(account.activity["Tue"], 5);
}

#[test]
fn parses_are_independent() {
    let parser = Account::parser().unwrap();
    let mut first = parser.parse_str(ACCOUNT, "");
    first.items.clear();
    let second = parser.parse_str(ACCOUNT, "");

    assert_eq!(second.items.len(), 5);
    assert_eq!(parser.parse_str("<p>empty</p>", ""), Account::default());
}

#[test]
fn adapter_converts_registered_models() {
    init_tracing();
    let mut registry = ParserRegistry::new();
    registry.register_model::<Account>().unwrap();
    let adapter = ResponseAdapter::new(registry);

    let body = ResponseBody::new(ACCOUNT.as_bytes()).with_content_type("text/html; charset=utf-8");
    let account: Account = adapter
        .convert(&body, "https://social.example/users/jane/")
        .unwrap();
    assert_eq!(account.name, "Jane Doe");
    assert_eq!(account.homepage, "https://social.example/users/about");

    assert!(adapter.convert::<String>(&body, "").is_none());
}

#[test]
fn schema_matches_typed_parser() {
    let schema = ExtractionSchema::from_json(
        r#"{
            "fields": [
                {"alias": "name", "selector": ".profile .user-name"},
                {"alias": "followers", "selector": ".followers", "target_type": "int"},
                {"alias": "items", "selector": "li.item", "multiple": true}
            ]
        }"#,
    )
    .unwrap();
    let record = schema.compile().unwrap().extract_str(ACCOUNT, "");

    assert_eq!(record["name"], "Jane Doe");
    assert_eq!(record["followers"], 0);
    assert_eq!(record["items"].as_array().map(Vec::len), Some(5));
}
