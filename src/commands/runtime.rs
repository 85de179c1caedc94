use crate::api::ApiClient;
use crate::cli::{
    Cli, CommentCommands, Commands, IssueCommands, LangCommands, OrgCommands, ReportArgs,
    ResolutionCommands,
};
use crate::domain::models::{
    IssueFilters, JsonOut, LanguageReport, NewOrganization, Session, SubmitReport,
};
use crate::i18n::{LanguageStore, ALL_LANGUAGES};
use crate::services::issues::submit_report;
use crate::services::notify::Notifier;
use crate::services::orgs::member_spec;
use crate::services::output::{print_one, print_out, wire_name};
use crate::services::session::require_session;
use crate::services::storage::{audit, load_config, save_config};
use crate::services::wizard::{ReportWizard, WizardError};

pub fn handle_runtime_commands(
    cli: &Cli,
    store: &mut LanguageStore,
    api: &ApiClient,
    session: Option<&Session>,
    notifier: &mut Notifier,
) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Report(args) => run_report(cli, args, store, api, session, notifier)?,
        Commands::Issues { command } => match command {
            IssueCommands::List {
                page,
                limit,
                category,
                status,
                priority,
                search,
            } => {
                let filters = IssueFilters {
                    category: *category,
                    status: *status,
                    priority: *priority,
                    search: search.clone(),
                };
                let result = api.get_issues(*page, *limit, &filters)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JsonOut {
                            ok: true,
                            data: result
                        })?
                    );
                } else if result.issues.is_empty() {
                    println!("{}", store.resolve("issues.empty"));
                } else {
                    for i in &result.issues {
                        println!(
                            "{}\t{}\t{}\t{}",
                            i.id,
                            wire_name(&i.category),
                            wire_name(&i.status),
                            i.title
                        );
                    }
                }
            }
            IssueCommands::Show { id } => {
                let issue = api.get_issue(id)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JsonOut {
                            ok: true,
                            data: issue
                        })?
                    );
                } else {
                    println!("id: {}", issue.id);
                    println!("title: {}", issue.title);
                    println!("category: {}", wire_name(&issue.category));
                    println!("status: {}", wire_name(&issue.status));
                    println!("priority: {}", wire_name(&issue.priority));
                    println!("urgency: {}", wire_name(&issue.urgency));
                    println!("address: {}", issue.location.address);
                    println!("votes: +{} / -{}", issue.upvotes, issue.downvotes);
                    if !issue.description.is_empty() {
                        println!("description: {}", issue.description);
                    }
                }
            }
            IssueCommands::Upvote { id } => {
                let issue = api.upvote_issue(id)?;
                audit("issue_upvote", serde_json::json!({ "issue": id }));
                notifier.success(store.resolve_with("issues.upvoted", &[("id", id.as_str())]));
                print_one(cli.json, &issue, |i| {
                    format!("{}\t+{} / -{}", i.id, i.upvotes, i.downvotes)
                })?;
            }
            IssueCommands::Downvote { id } => {
                let issue = api.downvote_issue(id)?;
                audit("issue_downvote", serde_json::json!({ "issue": id }));
                notifier.success(store.resolve_with("issues.downvoted", &[("id", id.as_str())]));
                print_one(cli.json, &issue, |i| {
                    format!("{}\t+{} / -{}", i.id, i.upvotes, i.downvotes)
                })?;
            }
            IssueCommands::Mine => {
                require_session()?;
                let issues = api.my_issues()?;
                if !cli.json && issues.is_empty() {
                    println!("{}", store.resolve("issues.empty"));
                } else {
                    print_out(cli.json, &issues, |i| {
                        format!("{}\t{}\t{}", i.id, wire_name(&i.status), i.title)
                    })?;
                }
            }
        },
        Commands::Orgs { command } => match command {
            OrgCommands::List {
                page,
                limit,
                search,
                category,
            } => {
                let result =
                    api.get_organizations(*page, *limit, search.as_deref(), category.as_deref())?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JsonOut {
                            ok: true,
                            data: result
                        })?
                    );
                } else if result.organizations.is_empty() {
                    println!("{}", store.resolve("orgs.empty"));
                } else {
                    for o in &result.organizations {
                        println!("{}\t{}\t{} members", o.id, o.name, o.members.len());
                    }
                }
            }
            OrgCommands::Show { id } => {
                let org = api.get_organization(id)?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JsonOut { ok: true, data: org })?
                    );
                } else {
                    println!("id: {}", org.id);
                    println!("name: {}", org.name);
                    if !org.description.is_empty() {
                        println!("description: {}", org.description);
                    }
                    for m in &org.members {
                        let who = m
                            .name
                            .clone()
                            .or_else(|| m.email.clone())
                            .or_else(|| m.user_id.clone())
                            .unwrap_or_default();
                        println!("member: {}\t{}", who, m.role);
                    }
                }
            }
            OrgCommands::Create {
                name,
                description,
                category,
            } => {
                require_session()?;
                let org = api.create_organization(&NewOrganization {
                    name: name.clone(),
                    description: description.clone(),
                    category: category.clone(),
                })?;
                audit("org_create", serde_json::json!({ "org": org.id }));
                notifier.success(store.resolve_with("orgs.created", &[("name", name.as_str())]));
                print_one(cli.json, &org, |o| format!("{}\t{}", o.id, o.name))?;
            }
            OrgCommands::AddMember { org, member, role } => {
                require_session()?;
                let spec = member_spec(member, role)?;
                let updated = api.add_member(org, &spec)?;
                audit(
                    "org_add_member",
                    serde_json::json!({ "org": org, "member": member, "role": spec.role }),
                );
                notifier.success(store.resolve_with("orgs.member_added", &[("org", org.as_str())]));
                print_one(cli.json, &updated, |o| {
                    format!("{}\t{} members", o.id, o.members.len())
                })?;
            }
            OrgCommands::RemoveMember { org, user } => {
                require_session()?;
                api.remove_member(org, user)?;
                audit(
                    "org_remove_member",
                    serde_json::json!({ "org": org, "user": user }),
                );
                notifier
                    .success(store.resolve_with("orgs.member_removed", &[("org", org.as_str())]));
                print_one(cli.json, user, |_| format!("removed {} from {}", user, org))?;
            }
        },
        Commands::Comments { command } => match command {
            CommentCommands::List { issue } => {
                let comments = api.get_comments(issue)?;
                print_out(cli.json, &comments, |c| {
                    format!(
                        "{}\t{}\t{} likes\t{}",
                        c.id,
                        c.author.clone().unwrap_or_else(|| "anonymous".to_string()),
                        c.likes,
                        c.text
                    )
                })?;
            }
            CommentCommands::Add { issue, text } => {
                require_session()?;
                let comment = api.add_comment(issue, text)?;
                notifier.success(store.resolve("comments.added"));
                print_one(cli.json, &comment, |c| format!("{}\t{}", c.id, c.text))?;
            }
            CommentCommands::Edit { id, text } => {
                require_session()?;
                let comment = api.update_comment(id, text)?;
                print_one(cli.json, &comment, |c| format!("{}\t{}", c.id, c.text))?;
            }
            CommentCommands::Delete { id } => {
                require_session()?;
                api.delete_comment(id)?;
                notifier.success(store.resolve("comments.deleted"));
                print_one(cli.json, id, |_| format!("deleted comment {}", id))?;
            }
            CommentCommands::Like { id } => {
                let comment = api.like_comment(id)?;
                notifier.success(store.resolve("comments.liked"));
                print_one(cli.json, &comment, |c| format!("{}\t{} likes", c.id, c.likes))?;
            }
        },
        Commands::Resolutions { command } => match command {
            ResolutionCommands::List { issue } => {
                let resolutions = api.get_resolutions(issue)?;
                print_out(cli.json, &resolutions, |r| {
                    format!(
                        "{}\t{}\t{} likes\t{}",
                        r.id,
                        wire_name(&r.status),
                        r.likes,
                        r.description
                    )
                })?;
            }
            ResolutionCommands::Add { issue, description } => {
                require_session()?;
                let resolution = api.add_resolution(issue, description)?;
                notifier.success(store.resolve("resolutions.added"));
                print_one(cli.json, &resolution, |r| {
                    format!("{}\t{}", r.id, wire_name(&r.status))
                })?;
            }
            ResolutionCommands::Like { id } => {
                let resolution = api.like_resolution(id)?;
                notifier.success(store.resolve("resolutions.liked"));
                print_one(cli.json, &resolution, |r| {
                    format!("{}\t{} likes", r.id, r.likes)
                })?;
            }
            ResolutionCommands::SetStatus { id, status } => {
                require_session()?;
                let resolution = api.set_resolution_status(id, *status)?;
                notifier.success(store.resolve("resolutions.status_set"));
                print_one(cli.json, &resolution, |r| {
                    format!("{}\t{}", r.id, wire_name(&r.status))
                })?;
            }
        },
        Commands::Lang { command } => match command {
            LangCommands::List => {
                let reports: Vec<LanguageReport> = ALL_LANGUAGES
                    .iter()
                    .map(|l| LanguageReport {
                        code: l.code().to_string(),
                        name: l.native_name().to_string(),
                        active: *l == store.language(),
                    })
                    .collect();
                print_out(cli.json, &reports, |r| {
                    format!(
                        "{}\t{}{}",
                        r.code,
                        r.name,
                        if r.active { "\t(active)" } else { "" }
                    )
                })?;
            }
            LangCommands::Show => {
                let data = serde_json::json!({
                    "code": store.language().code(),
                    "name": store.language().native_name(),
                    "version": store.version(),
                });
                print_one(cli.json, data, |d| {
                    format!("language: {}", d["code"].as_str().unwrap_or_default())
                })?;
            }
            LangCommands::Set { code } => {
                let changed = store.set_language(code);
                let mut config = load_config()?;
                config.language = Some(store.language().code().to_string());
                save_config(&config)?;
                if changed {
                    notifier.success(
                        store.resolve_with("lang.changed", &[("name", store.language().native_name())]),
                    );
                }
                let data = serde_json::json!({
                    "code": store.language().code(),
                    "changed": changed,
                    "version": store.version(),
                });
                print_one(cli.json, data, |d| {
                    format!("language: {}", d["code"].as_str().unwrap_or_default())
                })?;
            }
        },
        Commands::Account { .. } | Commands::Admin { .. } => {
            unreachable!("handled before runtime dispatch")
        }
    }

    Ok(())
}

fn advance(wizard: &mut ReportWizard, store: &LanguageStore) -> anyhow::Result<()> {
    if !wizard.next(store) {
        return Err(anyhow::Error::new(WizardError::Validation(
            wizard.errors().clone(),
        )));
    }
    Ok(())
}

/// Drive the wizard through its steps from the parsed flags, then submit.
fn run_report(
    cli: &Cli,
    args: &ReportArgs,
    store: &LanguageStore,
    api: &ApiClient,
    session: Option<&Session>,
    notifier: &mut Notifier,
) -> anyhow::Result<()> {
    let mut wizard = ReportWizard::new();
    let draft = &mut wizard.draft;
    draft.title = args.title.clone().unwrap_or_default();
    draft.description = args.description.clone().unwrap_or_default();
    draft.category = args.category;
    draft.priority = args.priority;
    draft.urgency = args.urgency;
    draft.contact.name = args.contact_name.clone().unwrap_or_default();
    draft.contact.email = args.contact_email.clone().unwrap_or_default();
    draft.contact.phone = args.contact_phone.clone().unwrap_or_default();
    draft.contact.is_anonymous = args.anonymous;
    draft.additional.estimated_cost = args.estimated_cost;
    draft.additional.affected_people = args.affected_people;
    draft.additional.safety_concern = args.safety_concern;
    draft.additional.environmental_impact = args.environmental_impact;

    advance(&mut wizard, store)?;

    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        wizard.locate(lat, lon, api, store);
        if let Some(message) = wizard.location_error() {
            notifier.error(message.to_string());
        }
    }
    if let Some(address) = &args.address {
        // Manual entry always wins over a geocoded address.
        wizard.draft.location.address = address.clone();
    }
    advance(&mut wizard, store)?;

    for path in &args.images {
        wizard.attach_image(path, store)?;
    }
    advance(&mut wizard, store)?;

    let authenticated = session.is_some();
    let image_count = wizard.images().len();
    let issue = submit_report(
        &mut wizard,
        authenticated,
        args.as_guest,
        store,
        notifier,
        |draft, images| api.create_issue(draft, images),
    )?;
    audit(
        "report_submit",
        serde_json::json!({ "issue": issue.id, "guest": !authenticated }),
    );

    // Navigate to the created issue's detail view; fall back to the
    // creation response if the fresh fetch fails.
    let submitted_as_guest = !authenticated;
    let detail = api.get_issue(&issue.id).unwrap_or(issue);
    let report = SubmitReport {
        issue: detail,
        submitted_as_guest,
        image_count,
    };
    print_one(cli.json, report, |r| {
        format!("reported {}\t{}", r.issue.id, r.issue.title)
    })?;
    Ok(())
}
