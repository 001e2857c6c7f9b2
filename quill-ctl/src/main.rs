use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use directories::ProjectDirs;
use quill_client::{
    api::{
        self, ArticleId, Category, Comment, CommentId, NewArticle, NewComment, RegisterRequest,
        Tag, User,
    },
    ArticlesStore, AuthStore, Client, CommentsStore, Config, FileStorage, Redirect, UsersStore,
};

#[derive(structopt::StructOpt)]
struct Opt {
    /// Root of the REST API, defaults to $QUILL_API_URL
    #[structopt(short, long)]
    host: Option<String>,

    /// File keeping the session tokens between invocations
    #[structopt(long, parse(from_os_str))]
    session: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Log in, reading the password from QUILL_PASSWORD
    Login { email: String },

    /// Create an account, reading the password from QUILL_PASSWORD
    Register {
        first_name: String,
        last_name: String,
        email: String,
    },

    Logout,

    /// Show the logged-in user
    Whoami,

    /// List articles
    Articles,

    /// Show one article
    Article { id: i64 },

    NewArticle { title: String, content: String },

    DeleteArticle { id: i64 },

    Like { id: i64 },

    Unlike { id: i64 },

    /// Show the comment threads of an article
    Comments { article: i64 },

    /// Comment on an article, or reply to a comment with --parent
    Comment {
        article: i64,
        content: String,

        #[structopt(long)]
        parent: Option<i64>,
    },

    DeleteComment { id: i64 },

    Categories,

    Tags,

    /// List users grouped by role, admin only
    Users {
        /// Only show users whose name or email contains this
        #[structopt(long)]
        search: Option<String>,
    },
}

fn password() -> anyhow::Result<String> {
    std::env::var("QUILL_PASSWORD").context("retrieving QUILL_PASSWORD environment variable")
}

fn session_path(opt: &Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(p) = opt {
        return Ok(p.clone());
    }
    ProjectDirs::from("org", "quill", env!("CARGO_PKG_NAME"))
        .map(|dirs| dirs.config_dir().join("session.json"))
        .context("finding a configuration directory for the session file")
}

fn print_thread(comments: &[Comment], depth: usize) {
    for c in comments {
        println!(
            "{:indent$}#{} {} ({}): {}",
            "",
            c.id,
            c.author.full_name,
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.content,
            indent = depth * 4,
        );
        print_thread(&c.replies, depth + 1);
    }
}

fn print_users(users: &[User]) {
    for u in users {
        println!("    #{} {} <{}> {}", u.id, u.username, u.email, u.role.0);
    }
}

async fn run(cmd: Command, client: Client) -> anyhow::Result<()> {
    let auth = AuthStore::new(client.clone());
    match cmd {
        Command::Login { email } => {
            let user = auth
                .login(&email, &password()?)
                .await
                .context("logging in")?;
            println!("logged in as {}", user.display_name());
        }
        Command::Register {
            first_name,
            last_name,
            email,
        } => {
            let req = RegisterRequest {
                first_name,
                last_name,
                email,
                password: password()?,
            };
            let user = auth.register(&req).await.context("registering")?;
            println!("registered and logged in as {}", user.display_name());
        }
        Command::Logout => {
            auth.logout().await.context("logging out on the server")?;
            println!("logged out");
        }
        Command::Whoami => match auth.initialize().await.context("fetching profile")? {
            None => println!("not logged in"),
            Some(user) => println!(
                "{} <{}>{}",
                user.display_name(),
                user.email,
                if user.is_admin() { " (admin)" } else { "" }
            ),
        },
        Command::Articles => {
            let store = ArticlesStore::new(client);
            for a in store.load_all().await.context("listing articles")?.iter() {
                println!("#{} {} by {}", a.id, a.title, a.author.full_name);
            }
        }
        Command::Article { id } => {
            let a = client
                .fetch::<api::Article>(ArticleId(id))
                .await
                .with_context(|| format!("fetching article {id}"))?;
            println!("{}\nby {}, {}\n\n{}", a.title, a.author.full_name, a.created_at, a.content);
        }
        Command::NewArticle { title, content } => {
            let new = NewArticle { title, content };
            new.validate()?;
            let store = ArticlesStore::new(client);
            let a = store.create(&new).await.context("creating article")?;
            println!("created article #{}", a.id);
        }
        Command::DeleteArticle { id } => {
            ArticlesStore::new(client)
                .delete(ArticleId(id))
                .await
                .with_context(|| format!("deleting article {id}"))?;
        }
        Command::Like { id } => client
            .like_article(ArticleId(id))
            .await
            .with_context(|| format!("liking article {id}"))?,
        Command::Unlike { id } => client
            .unlike_article(ArticleId(id))
            .await
            .with_context(|| format!("unliking article {id}"))?,
        Command::Comments { article } => {
            let store = CommentsStore::new(client);
            store
                .load_for_article(ArticleId(article))
                .await
                .with_context(|| format!("fetching comments of article {article}"))?;
            println!("{} comments", store.count());
            print_thread(&store.nested(), 0);
        }
        Command::Comment {
            article,
            content,
            parent,
        } => {
            let new = NewComment {
                content,
                article_id: ArticleId(article),
                parent_id: parent.map(CommentId),
            };
            new.validate()?;
            let c = CommentsStore::new(client)
                .create(&new)
                .await
                .context("posting comment")?;
            println!("posted comment #{}", c.id);
        }
        Command::DeleteComment { id } => {
            client
                .delete::<Comment>(CommentId(id))
                .await
                .with_context(|| format!("deleting comment {id}"))?;
        }
        Command::Categories => {
            for c in client.list::<Category>().await.context("listing categories")? {
                match c.description {
                    Some(d) => println!("#{} {}: {}", c.id, c.name, d),
                    None => println!("#{} {}", c.id, c.name),
                }
            }
        }
        Command::Tags => {
            for t in client.list::<Tag>().await.context("listing tags")? {
                println!("#{} {}", t.id, t.name);
            }
        }
        Command::Users { search } => {
            let store = UsersStore::new(client);
            store.load_all().await.context("listing users")?;
            match search {
                Some(query) => print_users(&store.search(&query)),
                None => {
                    for (role, users) in store.users_by_role() {
                        println!("{role}:");
                        print_users(&users);
                    }
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opt = <Opt as structopt::StructOpt>::from_args();

    let mut config = Config::from_env().context("reading configuration from environment")?;
    if let Some(host) = &opt.host {
        let timeouts = (config.refresh_timeout, config.request_timeout);
        config = Config::new(host).with_context(|| format!("parsing host url {host:?}"))?;
        config.refresh_timeout = timeouts.0;
        config.request_timeout = timeouts.1;
    }
    let storage = FileStorage::new(session_path(&opt.session)?);
    tracing::debug!(path = ?storage.path(), "using session file");
    let client = Client::new(config, Arc::new(storage)).context("building http client")?;

    let mut redirects = client.navigator().subscribe();
    let res = run(opt.cmd, client).await;
    while let Ok(to) = redirects.try_recv() {
        match to {
            Redirect::Login { expired: true } => {
                eprintln!("your session expired, run `quill login` again")
            }
            Redirect::Login { expired: false } => eprintln!("you need to run `quill login` first"),
            Redirect::Home { error } => eprintln!("not allowed ({error})"),
        }
    }
    res
}
