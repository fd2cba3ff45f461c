//! Minimal server-rendered markup. Real templating is explicitly out of
//! scope; these builders exist so the session/CSRF/flash flow has pages to
//! land on. Every interpolated value goes through `escape`.

use crate::models::{CategoryWithCount, Post, PostDetail};

/// HTML-escapes a user-supplied value.
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Shared page shell: nav, flash banner, body.
pub fn layout(title: &str, nav_user: Option<&str>, flash: Option<&str>, body: &str) -> String {
    let nav = match nav_user {
        Some(name) => format!(
            r#"<a href="/">Home</a> <a href="/dashboard">Dashboard</a> <a href="/posts/create">New post</a> <a href="/logout">Logout ({})</a>"#,
            escape(name)
        ),
        None => r#"<a href="/">Home</a> <a href="/login">Login</a> <a href="/register">Register</a>"#
            .to_string(),
    };
    let flash_html = flash
        .map(|message| format!(r#"<p class="flash">{}</p>"#, escape(message)))
        .unwrap_or_default();
    format!(
        "<!DOCTYPE html><html><head><title>{}</title></head><body><nav>{}</nav>{}{}</body></html>",
        escape(title),
        nav,
        flash_html,
        body
    )
}

pub fn home_page(posts: &[PostDetail]) -> String {
    let mut body = String::from("<h1>Posts</h1>");
    if posts.is_empty() {
        body.push_str("<p>No posts yet.</p>");
    }
    for post in posts {
        body.push_str(&format!(
            r#"<article><h2>{}</h2><p>{} in {}: {} comment(s)</p><div>{}</div></article>"#,
            escape(&post.title),
            escape(&post.author_name),
            escape(&post.category_name),
            post.comments.len(),
            escape(&post.content),
        ));
    }
    body
}

pub fn register_page(csrf_token: &str) -> String {
    format!(
        r#"<h1>Register</h1>
<form method="post" action="/register">
<input type="hidden" name="_token" value="{csrf_token}">
<label>Name <input name="name"></label>
<label>Email <input name="email" type="email"></label>
<label>Password <input name="password" type="password"></label>
<button type="submit">Register</button>
</form>"#
    )
}

pub fn login_page(csrf_token: &str) -> String {
    format!(
        r#"<h1>Login</h1>
<form method="post" action="/login">
<input type="hidden" name="_token" value="{csrf_token}">
<label>Email <input name="email" type="email"></label>
<label>Password <input name="password" type="password"></label>
<button type="submit">Login</button>
</form>"#
    )
}

pub fn dashboard_page(posts: &[PostDetail], csrf_token: &str) -> String {
    let mut body = String::from("<h1>Your posts</h1>");
    if posts.is_empty() {
        body.push_str(r#"<p>Nothing yet. <a href="/posts/create">Write one</a>.</p>"#);
    }
    for post in posts {
        body.push_str(&format!(
            r#"<article><h2>{}</h2>
<a href="/posts/{}/edit">Edit</a>
<form method="post" action="/posts/{}/delete">
<input type="hidden" name="_token" value="{}">
<button type="submit">Delete</button>
</form></article>"#,
            escape(&post.title),
            post.id,
            post.id,
            csrf_token,
        ));
    }
    body
}

/// Create/edit form. `post` fills the fields when editing.
pub fn post_form_page(
    heading: &str,
    action: &str,
    categories: &[CategoryWithCount],
    post: Option<&Post>,
    csrf_token: &str,
) -> String {
    let title = post.map(|p| escape(&p.title)).unwrap_or_default();
    let content = post.map(|p| escape(&p.content)).unwrap_or_default();
    let mut options = String::new();
    for category in categories {
        let selected = if post.map(|p| p.category_id) == Some(category.id) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            category.id,
            selected,
            escape(&category.name)
        ));
    }
    format!(
        r#"<h1>{}</h1>
<form method="post" action="{}">
<input type="hidden" name="_token" value="{}">
<label>Title <input name="title" value="{}"></label>
<label>Category <select name="category_id">{}</select></label>
<label>Content <textarea name="content">{}</textarea></label>
<button type="submit">Save</button>
</form>"#,
        escape(heading),
        escape(action),
        csrf_token,
        title,
        options,
        content,
    )
}

pub fn error_page(message: &str) -> String {
    format!("<h1>{}</h1>", escape(message))
}
