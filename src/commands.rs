use crate::database::{self, MovieStore, UserStore};
use crate::model::{Movie, User};

pub fn init_db(db: &sled::Db, drop: bool) -> anyhow::Result<()> {
    database::initialize(db, drop)?;
    println!("Initialized database.");
    Ok(())
}

pub fn forge(db: &sled::Db) -> anyhow::Result<()> {
    database::initialize(db, false)?;

    let name = "Grey Li";
    let movies = [
        ("My Neighbor Totoro", "1988"),
        ("Dead Poets Society", "1989"),
        ("A Perfect World", "1993"),
        ("Leon", "1994"),
        ("Mahjong", "1996"),
        ("Swallowtail Butterfly", "1996"),
        ("King of Comedy", "1999"),
        ("Devils on the Doorstep", "1999"),
        ("WALL-E", "2008"),
        ("The Pork of Music", "2012"),
    ];

    // keep credentials if an account was already set up
    match db.get_user()? {
        Some(mut user) => {
            user.name = name.to_owned();
            db.put_user(&user)?;
        }
        None => db.put_user(&User {
            name: name.to_owned(),
            username: String::new(),
            password_hash: String::new(),
        })?,
    }
    for (title, year) in movies {
        db.add_movie(&Movie {
            title: title.to_owned(),
            year: year.to_owned(),
        })?;
    }
    println!("Done.");
    Ok(())
}

pub fn admin(db: &sled::Db, username: &str, password: &str) -> anyhow::Result<()> {
    database::initialize(db, false)?;

    let mut user = match db.get_user()? {
        Some(user) => {
            println!("Updating user...");
            user
        }
        None => {
            println!("Creating user...");
            User {
                name: "Admin".to_owned(),
                username: String::new(),
                password_hash: String::new(),
            }
        }
    };
    user.username = username.to_owned();
    user.set_password(password)?;
    db.put_user(&user)?;
    println!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    #[test]
    fn forge_seeds_sample_data() {
        let db = temp_db();
        forge(&db).unwrap();

        let movies = db.list_movies().unwrap();
        assert_eq!(movies.len(), 10);
        assert_eq!(movies[0].1.title, "My Neighbor Totoro");
        assert_eq!(movies[9].1.year, "2012");
        assert_eq!(db.get_user().unwrap().unwrap().name, "Grey Li");
    }

    #[test]
    fn forge_keeps_existing_credentials() {
        let db = temp_db();
        admin(&db, "admin", "password").unwrap();
        forge(&db).unwrap();

        let user = db.get_user().unwrap().unwrap();
        assert_eq!(user.name, "Grey Li");
        assert_eq!(user.username, "admin");
        assert!(user.validate_password("password"));
    }

    #[test]
    fn admin_creates_then_updates_the_single_account() {
        let db = temp_db();
        admin(&db, "admin", "password").unwrap();

        let user = db.get_user().unwrap().unwrap();
        assert_eq!(user.name, "Admin");
        assert_eq!(user.username, "admin");
        assert!(user.validate_password("password"));
        assert!(!user.validate_password("other"));

        // re-running rotates credentials but keeps the row (and its name)
        db.update_user_name("Grey Li").unwrap();
        admin(&db, "greyli", "secret").unwrap();
        let user = db.get_user().unwrap().unwrap();
        assert_eq!(user.name, "Grey Li");
        assert_eq!(user.username, "greyli");
        assert!(user.validate_password("secret"));
        assert!(!user.validate_password("password"));
    }

    #[test]
    fn init_db_drop_resets() {
        let db = temp_db();
        forge(&db).unwrap();
        init_db(&db, true).unwrap();
        assert_eq!(db.list_movies().unwrap().len(), 0);
        assert_eq!(db.get_user().unwrap(), None);
    }
}
