use crate::model::*;
use sled::transaction::TransactionError;

// Big-endian keys so that iterating the movies tree yields ids in
// ascending (insertion) order.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> u64 {
    use std::convert::TryInto;
    u64::from_be_bytes(id.as_ref().try_into().unwrap())
}

const MOVIES: &[u8] = b"movies";
const USER: &[u8] = b"user";
// The user tree holds at most one row, always under this key.
const USER_KEY: &[u8] = b"admin";

pub fn initialize(db: &sled::Db, drop: bool) -> sled::Result<()> {
    if drop {
        db.drop_tree(MOVIES)?;
        db.drop_tree(USER)?;
    }
    db.open_tree(MOVIES)?;
    db.open_tree(USER)?;
    Ok(())
}

pub trait UserStore {
    type Error;
    fn put_user(&self, user: &User) -> Result<(), Self::Error>;
    fn get_user(&self) -> Result<Option<User>, Self::Error>;
    fn update_user_name(&self, name: &str) -> Result<Option<()>, Self::Error>;
}

impl UserStore for sled::Db {
    type Error = sled::Error;

    fn put_user(&self, user: &User) -> sled::Result<()> {
        let tree = self.open_tree(USER)?;
        tree.insert(USER_KEY, bincode::serialize(user).unwrap())?;
        Ok(())
    }

    fn get_user(&self) -> sled::Result<Option<User>> {
        let tree = self.open_tree(USER)?;
        Ok(tree
            .get(USER_KEY)?
            .map(|raw| bincode::deserialize(&raw).unwrap()))
    }

    fn update_user_name(&self, name: &str) -> sled::Result<Option<()>> {
        let tree = self.open_tree(USER)?;
        match tree.transaction(|tree| {
            let raw = match tree.get(USER_KEY)? {
                Some(raw) => raw,
                None => return sled::transaction::abort(()),
            };
            let mut user: User = bincode::deserialize(&raw).unwrap();
            user.name = name.to_owned();
            tree.insert(USER_KEY, bincode::serialize(&user).unwrap())?;
            Ok(())
        }) {
            Ok(()) => Ok(Some(())),
            Err(TransactionError::Abort(())) => Ok(None),
            Err(TransactionError::Storage(e)) => Err(e),
        }
    }
}

pub trait MovieStore {
    type Error;
    fn add_movie(&self, movie: &Movie) -> Result<u64, Self::Error>;
    fn get_movie(&self, id: u64) -> Result<Option<Movie>, Self::Error>;
    fn update_movie(&self, id: u64, movie: &Movie) -> Result<Option<Movie>, Self::Error>;
    fn delete_movie(&self, id: u64) -> Result<Option<Movie>, Self::Error>;
    fn list_movies(&self) -> Result<Vec<(u64, Movie)>, Self::Error>;
}

impl MovieStore for sled::Db {
    type Error = sled::Error;

    fn add_movie(&self, movie: &Movie) -> sled::Result<u64> {
        let movies = self.open_tree(MOVIES)?;
        let id = self.generate_id()?;
        movies.insert(&serialize_id(id), bincode::serialize(movie).unwrap())?;
        Ok(id)
    }

    fn get_movie(&self, id: u64) -> sled::Result<Option<Movie>> {
        let movies = self.open_tree(MOVIES)?;
        Ok(movies
            .get(serialize_id(id))?
            .map(|raw| bincode::deserialize(&raw).unwrap()))
    }

    // Read-check-write in one transaction: a missing row aborts before
    // anything is written. Returns the replaced row.
    fn update_movie(&self, id: u64, movie: &Movie) -> sled::Result<Option<Movie>> {
        let movies = self.open_tree(MOVIES)?;
        let raw = bincode::serialize(movie).unwrap();
        match movies.transaction(move |movies| {
            let old = match movies.get(serialize_id(id))? {
                Some(old) => old,
                None => return sled::transaction::abort(()),
            };
            movies.insert(&serialize_id(id), raw.clone())?;
            Ok(bincode::deserialize::<Movie>(&old).unwrap())
        }) {
            Ok(old) => Ok(Some(old)),
            Err(TransactionError::Abort(())) => Ok(None),
            Err(TransactionError::Storage(e)) => Err(e),
        }
    }

    fn delete_movie(&self, id: u64) -> sled::Result<Option<Movie>> {
        let movies = self.open_tree(MOVIES)?;
        Ok(movies
            .remove(&serialize_id(id))?
            .map(|raw| bincode::deserialize(&raw).unwrap()))
    }

    fn list_movies(&self) -> sled::Result<Vec<(u64, Movie)>> {
        let movies = self.open_tree(MOVIES)?;
        movies
            .iter()
            .map(|item| {
                let (key, value) = item?;
                Ok((deserialize_id(key), bincode::deserialize(&value).unwrap()))
            })
            .collect()
    }
}
