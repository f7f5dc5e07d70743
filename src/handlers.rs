use crate::database::*;
use crate::model::*;
use actix_identity::Identity;
use actix_web::http::header;
use actix_web::{error, web, HttpMessage, HttpRequest, HttpResponse};
use actix_web_flash_messages::{FlashMessage, IncomingFlashMessages};
use log::debug;
use serde::{Deserialize, Serialize};

type Tera = web::Data<tera::Tera>;
type Db = web::Data<sled::Db>;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/", web::post().to(create))
        .route("/movie/edit/{movie_id}", web::get().to(edit_form))
        .route("/movie/edit/{movie_id}", web::post().to(edit))
        .route("/movie/delete/{movie_id}", web::post().to(delete))
        .route("/settings", web::get().to(settings_form))
        .route("/settings", web::post().to(settings))
        .route("/login", web::get().to(login_form))
        .route("/login", web::post().to(login))
        .route("/logout", web::get().to(logout))
        .default_service(web::route().to(not_found));
}

fn log_error<E: std::fmt::Debug>(err: E, message: &'static str) -> error::Error {
    debug!("{:?}", err);
    error::ErrorInternalServerError(message)
}

fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, location))
        .finish()
}

// Resolves the session cookie to the stored user. Anything short of a valid
// identity naming the current username is Anonymous, never an error.
fn authenticated_user(id: &Option<Identity>, db: &sled::Db) -> actix_web::Result<Option<User>> {
    let username = match id {
        Some(id) => match id.id() {
            Ok(username) => username,
            Err(_) => return Ok(None),
        },
        None => return Ok(None),
    };
    let user = db
        .get_user()
        .map_err(|err| log_error(err, "Database error"))?;
    Ok(user.filter(|user| user.username == username))
}

// Every page shows the stored display name in the header, logged in or not.
fn base_context(
    db: &sled::Db,
    authenticated: bool,
    messages: Option<&IncomingFlashMessages>,
) -> actix_web::Result<tera::Context> {
    let user = db
        .get_user()
        .map_err(|err| log_error(err, "Database error"))?;
    let mut ctx = tera::Context::new();
    ctx.insert("user", &user);
    ctx.insert("authenticated", &authenticated);
    let messages: Vec<&str> = messages
        .map(|messages| messages.iter().map(|message| message.content()).collect())
        .unwrap_or_default();
    ctx.insert("messages", &messages);
    Ok(ctx)
}

fn render(
    tera: &tera::Tera,
    template: &str,
    ctx: &tera::Context,
) -> actix_web::Result<HttpResponse> {
    let body = tera
        .render(template, ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::Ok().content_type("text/html").body(body))
}

fn render_not_found(
    tera: &tera::Tera,
    db: &sled::Db,
    authenticated: bool,
) -> actix_web::Result<HttpResponse> {
    let ctx = base_context(db, authenticated, None)?;
    let body = tera
        .render("404.html", &ctx)
        .map_err(|err| log_error(err, "Template error"))?;
    Ok(HttpResponse::NotFound().content_type("text/html").body(body))
}

#[derive(Serialize)]
struct MovieEntry {
    id: u64,
    title: String,
    year: String,
}

async fn index(
    id: Option<Identity>,
    messages: IncomingFlashMessages,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    let authenticated = authenticated_user(&id, &db)?.is_some();
    let mut ctx = base_context(&db, authenticated, Some(&messages))?;
    let movies: Vec<MovieEntry> = db
        .list_movies()
        .map_err(|err| log_error(err, "Database error"))?
        .into_iter()
        .map(|(id, movie)| MovieEntry {
            id,
            title: movie.title,
            year: movie.year,
        })
        .collect();
    ctx.insert("movies", &movies);
    render(&tera, "index.html", &ctx)
}

#[derive(Serialize, Deserialize)]
struct MovieForm {
    title: String,
    year: String,
}

async fn create(
    id: Option<Identity>,
    form: web::Form<MovieForm>,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        // anonymous writes bounce to the list without a message
        return Ok(redirect("/"));
    }
    let form = form.into_inner();
    let movie = Movie {
        title: form.title,
        year: form.year,
    };
    if !movie.valid() {
        FlashMessage::error("Invalid input.").send();
        return Ok(redirect("/"));
    }
    db.add_movie(&movie)
        .map_err(|err| log_error(err, "Database error"))?;
    FlashMessage::info("Item created.").send();
    Ok(redirect("/"))
}

async fn edit_form(
    id: Option<Identity>,
    messages: IncomingFlashMessages,
    path: web::Path<String>,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        return Ok(redirect("/"));
    }
    let movie_id = match path.into_inner().parse::<u64>() {
        Ok(movie_id) => movie_id,
        Err(_) => return render_not_found(&tera, &db, true),
    };
    let movie = match db
        .get_movie(movie_id)
        .map_err(|err| log_error(err, "Database error"))?
    {
        Some(movie) => movie,
        None => return render_not_found(&tera, &db, true),
    };
    let mut ctx = base_context(&db, true, Some(&messages))?;
    ctx.insert(
        "movie",
        &MovieEntry {
            id: movie_id,
            title: movie.title,
            year: movie.year,
        },
    );
    render(&tera, "edit.html", &ctx)
}

async fn edit(
    id: Option<Identity>,
    path: web::Path<String>,
    form: web::Form<MovieForm>,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        return Ok(redirect("/"));
    }
    let movie_id = match path.into_inner().parse::<u64>() {
        Ok(movie_id) => movie_id,
        Err(_) => return render_not_found(&tera, &db, true),
    };
    if db
        .get_movie(movie_id)
        .map_err(|err| log_error(err, "Database error"))?
        .is_none()
    {
        return render_not_found(&tera, &db, true);
    }
    let form = form.into_inner();
    let movie = Movie {
        title: form.title,
        year: form.year,
    };
    if !movie.valid() {
        // back to the form for the record that was being edited
        FlashMessage::error("Invalid input.").send();
        return Ok(redirect(&format!("/movie/edit/{}", movie_id)));
    }
    match db
        .update_movie(movie_id, &movie)
        .map_err(|err| log_error(err, "Database error"))?
    {
        Some(_) => {
            FlashMessage::info("Item updated.").send();
            Ok(redirect("/"))
        }
        None => render_not_found(&tera, &db, true),
    }
}

async fn delete(
    id: Option<Identity>,
    path: web::Path<String>,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        return Ok(redirect("/"));
    }
    let movie_id = match path.into_inner().parse::<u64>() {
        Ok(movie_id) => movie_id,
        Err(_) => return render_not_found(&tera, &db, true),
    };
    match db
        .delete_movie(movie_id)
        .map_err(|err| log_error(err, "Database error"))?
    {
        Some(_) => {
            FlashMessage::info("Item deleted.").send();
            Ok(redirect("/"))
        }
        None => render_not_found(&tera, &db, true),
    }
}

async fn settings_form(
    id: Option<Identity>,
    messages: IncomingFlashMessages,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        return Ok(redirect("/"));
    }
    let ctx = base_context(&db, true, Some(&messages))?;
    render(&tera, "settings.html", &ctx)
}

#[derive(Serialize, Deserialize)]
struct SettingsForm {
    name: String,
}

async fn settings(
    id: Option<Identity>,
    form: web::Form<SettingsForm>,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        return Ok(redirect("/"));
    }
    if !valid_name(&form.name) {
        FlashMessage::error("Invalid input.").send();
        return Ok(redirect("/settings"));
    }
    db.update_user_name(&form.name)
        .map_err(|err| log_error(err, "Database error"))?
        .ok_or_else(|| log_error("user row missing", "Database error"))?;
    FlashMessage::info("Settings updated.").send();
    Ok(redirect("/"))
}

async fn login_form(
    id: Option<Identity>,
    messages: IncomingFlashMessages,
    tera: Tera,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    let authenticated = authenticated_user(&id, &db)?.is_some();
    let ctx = base_context(&db, authenticated, Some(&messages))?;
    render(&tera, "login.html", &ctx)
}

#[derive(Serialize, Deserialize)]
struct LoginForm {
    username: String,
    password: String,
}

async fn login(
    req: HttpRequest,
    form: web::Form<LoginForm>,
    db: Db,
) -> actix_web::Result<HttpResponse> {
    if form.username.is_empty() || form.password.is_empty() {
        FlashMessage::error("Invalid input.").send();
        return Ok(redirect("/login"));
    }
    // One generic failure message; it never discloses which field was wrong.
    if let Some(user) = db
        .get_user()
        .map_err(|err| log_error(err, "Database error"))?
    {
        if user.username == form.username && user.validate_password(&form.password) {
            Identity::login(&req.extensions(), user.username)
                .map_err(|err| log_error(err, "Session error"))?;
            FlashMessage::info("Login success.").send();
            return Ok(redirect("/"));
        }
    }
    FlashMessage::error("Invalid username or password.").send();
    Ok(redirect("/login"))
}

async fn logout(id: Option<Identity>, db: Db) -> actix_web::Result<HttpResponse> {
    if authenticated_user(&id, &db)?.is_none() {
        return Ok(redirect("/"));
    }
    if let Some(id) = id {
        id.logout();
    }
    FlashMessage::info("Goodbye.").send();
    Ok(redirect("/"))
}

async fn not_found(id: Option<Identity>, tera: Tera, db: Db) -> actix_web::Result<HttpResponse> {
    let authenticated = authenticated_user(&id, &db)?.is_some();
    render_not_found(&tera, &db, authenticated)
}
