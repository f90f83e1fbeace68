use tablemerge_client::{ClientError, ColumnSchema, DocInfo, Row, TableClient, TableInfo, UserInfo};

/// Remote operations the merge engine needs.
///
/// [`TableClient`] is the production implementation. Errors are the client's
/// own so callers can inspect status codes and retry exhaustion.
pub trait TableStore {
    fn whoami(&self) -> Result<UserInfo, ClientError>;
    fn get_doc(&self, doc_id: &str) -> Result<DocInfo, ClientError>;
    fn get_table(&self, doc_id: &str, table_id: &str) -> Result<TableInfo, ClientError>;
    fn get_schema(&self, doc_id: &str, table_id: &str) -> Result<Vec<ColumnSchema>, ClientError>;
    fn get_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<Row>, ClientError>;
    fn create_column(
        &self,
        doc_id: &str,
        table_id: &str,
        column: &ColumnSchema,
    ) -> Result<(), ClientError>;
    fn upsert_rows(
        &self,
        doc_id: &str,
        table_id: &str,
        rows: &[Row],
        key_columns: &[&str],
    ) -> Result<(), ClientError>;
    fn delete_rows(&self, doc_id: &str, table_id: &str, row_ids: &[String]) -> Result<(), ClientError>;
}

impl TableStore for TableClient {
    fn whoami(&self) -> Result<UserInfo, ClientError> {
        TableClient::whoami(self)
    }

    fn get_doc(&self, doc_id: &str) -> Result<DocInfo, ClientError> {
        TableClient::get_doc(self, doc_id)
    }

    fn get_table(&self, doc_id: &str, table_id: &str) -> Result<TableInfo, ClientError> {
        TableClient::get_table(self, doc_id, table_id)
    }

    fn get_schema(&self, doc_id: &str, table_id: &str) -> Result<Vec<ColumnSchema>, ClientError> {
        TableClient::get_schema(self, doc_id, table_id)
    }

    fn get_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<Row>, ClientError> {
        TableClient::get_rows(self, doc_id, table_id)
    }

    fn create_column(
        &self,
        doc_id: &str,
        table_id: &str,
        column: &ColumnSchema,
    ) -> Result<(), ClientError> {
        TableClient::create_column(self, doc_id, table_id, column)
    }

    fn upsert_rows(
        &self,
        doc_id: &str,
        table_id: &str,
        rows: &[Row],
        key_columns: &[&str],
    ) -> Result<(), ClientError> {
        TableClient::upsert_rows(self, doc_id, table_id, rows, key_columns)
    }

    fn delete_rows(&self, doc_id: &str, table_id: &str, row_ids: &[String]) -> Result<(), ClientError> {
        TableClient::delete_rows(self, doc_id, table_id, row_ids)
    }
}

impl<T: TableStore + ?Sized> TableStore for &T {
    fn whoami(&self) -> Result<UserInfo, ClientError> {
        (**self).whoami()
    }

    fn get_doc(&self, doc_id: &str) -> Result<DocInfo, ClientError> {
        (**self).get_doc(doc_id)
    }

    fn get_table(&self, doc_id: &str, table_id: &str) -> Result<TableInfo, ClientError> {
        (**self).get_table(doc_id, table_id)
    }

    fn get_schema(&self, doc_id: &str, table_id: &str) -> Result<Vec<ColumnSchema>, ClientError> {
        (**self).get_schema(doc_id, table_id)
    }

    fn get_rows(&self, doc_id: &str, table_id: &str) -> Result<Vec<Row>, ClientError> {
        (**self).get_rows(doc_id, table_id)
    }

    fn create_column(
        &self,
        doc_id: &str,
        table_id: &str,
        column: &ColumnSchema,
    ) -> Result<(), ClientError> {
        (**self).create_column(doc_id, table_id, column)
    }

    fn upsert_rows(
        &self,
        doc_id: &str,
        table_id: &str,
        rows: &[Row],
        key_columns: &[&str],
    ) -> Result<(), ClientError> {
        (**self).upsert_rows(doc_id, table_id, rows, key_columns)
    }

    fn delete_rows(&self, doc_id: &str, table_id: &str, row_ids: &[String]) -> Result<(), ClientError> {
        (**self).delete_rows(doc_id, table_id, row_ids)
    }
}
