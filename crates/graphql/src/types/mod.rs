//! Type declarations of the library schema.

use crate::{descriptor::SchemaDescriptor, error::SchemaError};

pub const QUERY: &str = "Query";
pub const MUTATION: &str = "Mutation";
pub const SUBSCRIPTION: &str = "Subscription";

pub const BOOK: &str = "Book";
pub const AUTHOR: &str = "Author";
pub const USER: &str = "User";
pub const FILE: &str = "File";
pub const POST: &str = "Post";
pub const SEARCH_RESULT: &str = "Result";
pub const ALLOWED_COLOR: &str = "AllowedColor";

/// Topic the `postAdded` subscription listens on.
pub const POST_ADDED: &str = "postAdded";

/// Declare the library schema.
///
/// Books are told apart from authors in search results by their `title`;
/// authors by their non-null `name`.
pub fn library_schema() -> Result<SchemaDescriptor, SchemaError> {
    SchemaDescriptor::builder()
        .enumeration(ALLOWED_COLOR, ["RED", "GREEN", "WHITE", "YELLOW", "BLACK"])
        .union(SEARCH_RESULT, [BOOK, AUTHOR])
        .object(BOOK, |o| {
            o.field("id", "String")
                .field_with("title", "String", |f| f.directive("upper"))
                .field("color", ALLOWED_COLOR)
                .field("authors", "[Author]")
                .shape(["title"])
        })
        .object(AUTHOR, |o| {
            o.field("id", "String")
                .field("name", "String!")
                .field("phone", "String")
                .field("email", "String")
        })
        .object(USER, |o| {
            o.field("id", "String")
                .field("name", "String!")
                .field("phone", "String")
                .field("email", "String")
                .field("authors", "[Author]")
        })
        .object(FILE, |o| {
            o.field("filename", "String!")
                .field("mimetype", "String!")
                .field("encoding", "String!")
        })
        .object(POST, |o| o.field("author", "String").field("comment", "String"))
        .object(QUERY, |o| {
            o.field_with("getBook", "Book", |f| {
                f.argument("id", "String").argument("color", "AllowedColor!")
            })
            .field("getBooks", "[Book]")
            .field("getAuthors", "[Author]")
            .field_with("search", "[Result]", |f| f.argument("text", "String"))
            .field_with("getAppUser", "User", |f| f.argument("id", "String"))
            .field("me", "User")
            .field("authenticationError", "String")
            .field("uploads", "[File]")
            .field("posts", "[Post]")
        })
        .object(MUTATION, |o| {
            o.field_with("userInputError", "String", |f| f.argument("input", "String"))
                .field_with("singleUpload", "File!", |f| f.argument("file", "Upload!"))
                .field_with("addPost", "Post", |f| {
                    f.argument("author", "String").argument("comment", "String")
                })
        })
        .object(SUBSCRIPTION, |o| {
            o.field_with(POST_ADDED, "Post", |f| f.topic(POST_ADDED))
        })
        .query(QUERY)
        .mutation(MUTATION)
        .subscription(SUBSCRIPTION)
        .build()
}
