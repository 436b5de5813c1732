use crate::areas::repository::Repository;
use crate::artifacts::objects::object_id::ObjectId;

impl Repository {
    /// Replace the index with the contents of the given tree and persist it.
    pub fn read_tree(&self, oid: &str) -> anyhow::Result<()> {
        let oid = ObjectId::try_parse(oid.to_string())?;

        let mut index = self.index();
        index.reread_if_necessary()?;

        index.read_tree(&oid, self.database())?;
        index.write()?;
        drop(index);
        self.on_index_changed();

        Ok(())
    }
}
